//! Append-only log of finished intervals.
//!
//! Insertion order is chronological order. Records are never edited except
//! by [`SessionLedger::rename_tag`], and never removed by the core.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::timer::{Completion, Mode};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    /// Older logs predate ids; they get one on load.
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub tag: String,
    /// Seconds actually spent.
    pub duration: u64,
    /// Creation time, ms since epoch.
    pub timestamp: u64,
    /// `false` when the user finished early.
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Absent in older logs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<Mode>,
}

impl SessionRecord {
    pub fn new(tag: impl Into<String>, duration: u64, timestamp: u64, completed: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            tag: tag.into(),
            duration,
            timestamp,
            completed,
            note: None,
            mode: None,
        }
    }

    /// Build the record for a finished interval, consuming the note.
    pub fn from_completion(completion: &Completion, tag: &str, note: Option<String>) -> Self {
        Self {
            note: note.filter(|n| !n.trim().is_empty()),
            mode: Some(completion.mode),
            ..Self::new(
                tag,
                completion.duration_secs,
                completion.at_ms,
                completion.completed,
            )
        }
    }
}

/// What a rename touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenameOutcome {
    pub renamed: usize,
    /// The caller's active tag equals the old name and must follow.
    pub active_tag_affected: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionLedger {
    records: Vec<SessionRecord>,
}

impl SessionLedger {
    pub fn from_records(records: Vec<SessionRecord>) -> Self {
        Self { records }
    }

    pub fn append(&mut self, record: SessionRecord) {
        tracing::info!(
            tag = %record.tag,
            duration = record.duration,
            completed = record.completed,
            "session recorded"
        );
        self.records.push(record);
    }

    /// Rewrite `old` to `new` on every matching record.
    pub fn rename_tag(&mut self, old: &str, new: &str, active_tag: &str) -> RenameOutcome {
        if old == new {
            return RenameOutcome::default();
        }
        let mut renamed = 0;
        for record in self.records.iter_mut().filter(|r| r.tag == old) {
            record.tag = new.to_string();
            renamed += 1;
        }
        RenameOutcome {
            renamed,
            active_tag_affected: active_tag == old,
        }
    }

    pub fn all(&self) -> &[SessionRecord] {
        &self.records
    }

    /// Newest first.
    pub fn recent(&self, limit: usize) -> impl Iterator<Item = &SessionRecord> {
        self.records.iter().rev().take(limit)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
