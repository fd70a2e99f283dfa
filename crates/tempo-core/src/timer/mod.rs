mod engine;
mod mode;

pub use engine::{remaining_secs, Completion, TimerEngine, TimerState};
pub(crate) use engine::at;
pub use mode::{Durations, Mode};
