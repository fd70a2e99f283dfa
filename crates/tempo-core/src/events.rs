use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ledger::SessionRecord;
use crate::timer::Mode;

/// Every committed state change produces an Event.
/// The display layer subscribes to them or polls snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    TimerStarted {
        mode: Mode,
        time_left: u64,
        target_end_time: u64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        mode: Mode,
        time_left: u64,
        at: DateTime<Utc>,
    },
    TimerReset {
        mode: Mode,
        time_left: u64,
        at: DateTime<Utc>,
    },
    /// An interval ended, naturally or by early finish.
    TimerCompleted {
        mode: Mode,
        next_mode: Mode,
        completed: bool,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    ModeSwitched {
        from: Mode,
        to: Mode,
        time_left: u64,
        at: DateTime<Utc>,
    },
    /// A confirmation prompt was raised or dismissed.
    ConfirmChanged {
        prompt: ConfirmPrompt,
        open: bool,
        at: DateTime<Utc>,
    },
    SessionRecorded {
        record: SessionRecord,
    },
    TagSelected {
        tag: String,
    },
    TagAdded {
        tag: String,
    },
    TagRenamed {
        from: String,
        to: String,
        sessions_updated: usize,
    },
    TagRemoved {
        tag: String,
        active_tag: String,
    },
    NoteChanged {
        note: String,
    },
    SettingsApplied {
        work_secs: u64,
        break_secs: u64,
        sound_enabled: bool,
        rebaselined: bool,
    },
    StateSnapshot {
        mode: Mode,
        time_left: u64,
        display: String,
        is_running: bool,
        target_end_time: Option<u64>,
        progress: f64,
        tag: String,
        session_note: String,
        show_finish_confirm: bool,
        show_mode_confirm: bool,
        at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmPrompt {
    FinishEarly,
    ModeSwitch,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_tagged_by_type() {
        let event = Event::TagSelected { tag: "Study".into() };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "tag_selected");
        assert_eq!(json["tag"], "Study");
    }
}
