//! # Tempo Core Library
//!
//! This library provides the core logic for the Tempo Pomodoro timer. The
//! CLI binary is a thin display/input layer over the same types.
//!
//! ## Architecture
//!
//! - **Timer Engine**: A wall-clock-based state machine. The caller passes
//!   the current time into every command and periodically invokes `tick()`;
//!   remaining time is always re-derived from the absolute target, so
//!   suspension never drifts the countdown
//! - **Session Ledger**: Append-only log of finished intervals with bulk tag
//!   rename
//! - **Storage**: A key-value store (SQLite) holding the timer-state blob and
//!   the session log, plus TOML-based configuration
//! - **Pomodoro**: The single state-owning object that turns user intents
//!   into engine/ledger operations and broadcasts [`Event`]s
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: Core timer state machine
//! - [`SessionLedger`]: Session history
//! - [`Pomodoro`]: Intent handling, persistence and side channels
//! - [`Config`]: Application configuration management

pub mod clock;
pub mod error;
pub mod events;
pub mod format;
pub mod ledger;
pub mod notify;
pub mod pomodoro;
pub mod stats;
pub mod storage;
pub mod tags;
pub mod timer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ConfigError, CoreError, StorageError, ValidationError};
pub use events::{ConfirmPrompt, Event};
pub use ledger::{RenameOutcome, SessionLedger, SessionRecord};
pub use notify::{Cue, Notifier, SoundPlayer};
pub use pomodoro::{ModeSwitch, Pomodoro};
pub use stats::{Stats, TagSummary};
pub use storage::{Config, Database, KvStore, MemoryStore, PersistedState};
pub use tags::TagList;
pub use timer::{Completion, Durations, Mode, TimerEngine, TimerState};
