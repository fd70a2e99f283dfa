//! The two persisted blobs and their load-or-default constructors.
//!
//! Loads never fail: a missing or unreadable blob is logged and replaced by
//! a fully populated default, so callers never branch on partial data.

use serde::{Deserialize, Serialize};

use super::KvStore;
use crate::error::StorageError;
use crate::ledger::SessionRecord;
use crate::timer::{Durations, Mode, TimerState};

pub const STATE_KEY: &str = "tempo.state";
pub const SESSIONS_KEY: &str = "tempo.sessions";

/// Flat snapshot of everything needed to resume after a restart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistedState {
    pub tag: String,
    pub mode: Mode,
    pub time_left: u64,
    pub is_running: bool,
    pub show_finish_confirm: bool,
    pub show_mode_confirm: bool,
    pub session_note: String,
    pub target_end_time: Option<u64>,
    pub interval_secs: u64,
    pub work_time_left: Option<u64>,
    pub break_time_left: Option<u64>,
}

impl PersistedState {
    pub fn fresh(durations: &Durations, tag: &str) -> Self {
        Self::from_parts(&TimerState::fresh(durations), tag)
    }

    pub fn from_parts(timer: &TimerState, tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            mode: timer.mode,
            time_left: timer.time_left,
            is_running: timer.is_running,
            show_finish_confirm: false,
            show_mode_confirm: false,
            session_note: String::new(),
            target_end_time: timer.target_end_time,
            interval_secs: timer.interval_secs,
            work_time_left: timer.work_time_left,
            break_time_left: timer.break_time_left,
        }
    }

    pub fn timer_state(&self) -> TimerState {
        TimerState {
            mode: self.mode,
            time_left: self.time_left,
            is_running: self.is_running,
            target_end_time: self.target_end_time,
            interval_secs: self.interval_secs,
            work_time_left: self.work_time_left,
            break_time_left: self.break_time_left,
        }
    }

    /// Read the blob under [`STATE_KEY`], falling back to a fresh state.
    pub fn load_or_default<S: KvStore>(store: &S, durations: &Durations, default_tag: &str) -> Self {
        let mut state = match load_json::<S, Self>(store, STATE_KEY) {
            Some(state) => state,
            None => return Self::fresh(durations, default_tag),
        };
        if state.tag.trim().is_empty() {
            state.tag = default_tag.to_string();
        }
        // A stopped timer at zero has nothing left to run.
        if !state.is_running && state.time_left == 0 {
            state.time_left = durations.for_mode(state.mode);
            state.interval_secs = state.time_left;
        }
        state
    }
}

impl Default for PersistedState {
    fn default() -> Self {
        Self::fresh(&Durations::default(), crate::tags::DEFAULT_TAGS[0])
    }
}

/// Read the session log under [`SESSIONS_KEY`], falling back to empty.
pub fn load_sessions<S: KvStore>(store: &S) -> Vec<SessionRecord> {
    load_json(store, SESSIONS_KEY).unwrap_or_default()
}

fn load_json<S, T>(store: &S, key: &str) -> Option<T>
where
    S: KvStore,
    T: for<'de> Deserialize<'de>,
{
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            tracing::warn!(key, error = %e, "failed to read persisted value; using defaults");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            let error = StorageError::Corrupted {
                key: key.to_string(),
                message: e.to_string(),
            };
            tracing::warn!(%error, "using defaults");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn missing_blob_yields_fresh_state() {
        let store = MemoryStore::new();
        let state = PersistedState::load_or_default(&store, &Durations::default(), "Work");
        assert_eq!(state.mode, Mode::Work);
        assert_eq!(state.time_left, 1500);
        assert!(!state.is_running);
        assert_eq!(state.target_end_time, None);
        assert_eq!(state.session_note, "");
    }

    #[test]
    fn corrupted_blob_yields_fresh_state() {
        let store = MemoryStore::new();
        store.set(STATE_KEY, "{not json").unwrap();
        store.set(SESSIONS_KEY, "[{\"tag\":").unwrap();
        let state = PersistedState::load_or_default(&store, &Durations::default(), "Work");
        assert_eq!(state, PersistedState::fresh(&Durations::default(), "Work"));
        assert!(load_sessions(&store).is_empty());
    }

    #[test]
    fn partial_blob_fills_missing_fields() {
        let store = MemoryStore::new();
        store
            .set(STATE_KEY, r#"{"mode":"break","timeLeft":120}"#)
            .unwrap();
        let state = PersistedState::load_or_default(&store, &Durations::default(), "Study");
        assert_eq!(state.mode, Mode::Break);
        assert_eq!(state.time_left, 120);
        assert_eq!(state.tag, "Study");
        assert!(!state.show_finish_confirm);
    }

    #[test]
    fn blob_uses_camel_case_keys() {
        let json = serde_json::to_value(PersistedState::default()).unwrap();
        for key in ["timeLeft", "isRunning", "targetEndTime", "intervalSecs", "sessionNote", "showFinishConfirm"] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        assert!(json["targetEndTime"].is_null());
    }
}
