//! Category labels offered to the user.
//!
//! Validation lives here so the ledger only ever sees clean names.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub const DEFAULT_TAGS: [&str; 3] = ["Work", "Study", "Reading"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagList(Vec<String>);

impl TagList {
    /// Trims, drops blanks and duplicates; falls back to the defaults when
    /// nothing usable remains.
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list: Vec<String> = Vec::new();
        for tag in tags {
            let tag = tag.as_ref().trim();
            if !tag.is_empty() && !list.iter().any(|t| t == tag) {
                list.push(tag.to_string());
            }
        }
        if list.is_empty() {
            return Self::default();
        }
        Self(list)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.iter().any(|t| t == tag)
    }

    pub fn first(&self) -> &str {
        self.0.first().map(String::as_str).unwrap_or(DEFAULT_TAGS[0])
    }

    /// Returns the cleaned name that was added.
    pub fn add(&mut self, tag: &str) -> Result<String, ValidationError> {
        let tag = clean(tag)?;
        if self.contains(&tag) {
            return Err(ValidationError::DuplicateTag(tag));
        }
        self.0.push(tag.clone());
        Ok(tag)
    }

    /// Renames in place, keeping position. Returns the cleaned new name.
    pub fn rename(&mut self, old: &str, new: &str) -> Result<String, ValidationError> {
        let new = clean(new)?;
        let pos = self
            .0
            .iter()
            .position(|t| t == old)
            .ok_or_else(|| ValidationError::UnknownTag(old.to_string()))?;
        if new != old && self.contains(&new) {
            return Err(ValidationError::DuplicateTag(new));
        }
        self.0[pos] = new.clone();
        Ok(new)
    }

    pub fn remove(&mut self, tag: &str) -> Result<(), ValidationError> {
        let pos = self
            .0
            .iter()
            .position(|t| t == tag)
            .ok_or_else(|| ValidationError::UnknownTag(tag.to_string()))?;
        if self.0.len() == 1 {
            return Err(ValidationError::LastTag(tag.to_string()));
        }
        self.0.remove(pos);
        Ok(())
    }
}

impl Default for TagList {
    fn default() -> Self {
        Self(DEFAULT_TAGS.iter().map(|t| t.to_string()).collect())
    }
}

fn clean(tag: &str) -> Result<String, ValidationError> {
    let tag = tag.trim();
    if tag.is_empty() {
        return Err(ValidationError::EmptyTag);
    }
    Ok(tag.to_string())
}
