use serde::{Deserialize, Serialize};

use crate::storage::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Work,
    Break,
}

impl Mode {
    pub fn opposite(self) -> Self {
        match self {
            Mode::Work => Mode::Break,
            Mode::Break => Mode::Work,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Mode::Work => "Work",
            Mode::Break => "Break",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Configured interval lengths in seconds.
///
/// The engine keeps a copy but does not own it; the settings provider pushes
/// new values through [`TimerEngine::set_durations`](super::TimerEngine::set_durations).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Durations {
    pub work_secs: u64,
    pub break_secs: u64,
}

impl Durations {
    pub const DEFAULT_WORK_SECS: u64 = 25 * 60;
    pub const DEFAULT_BREAK_SECS: u64 = 5 * 60;

    /// Zero-length intervals are bumped to one second.
    pub fn new(work_secs: u64, break_secs: u64) -> Self {
        Self {
            work_secs: work_secs.max(1),
            break_secs: break_secs.max(1),
        }
    }

    pub fn for_mode(&self, mode: Mode) -> u64 {
        match mode {
            Mode::Work => self.work_secs,
            Mode::Break => self.break_secs,
        }
    }
}

impl Default for Durations {
    fn default() -> Self {
        Self::new(Self::DEFAULT_WORK_SECS, Self::DEFAULT_BREAK_SECS)
    }
}

impl From<&Config> for Durations {
    fn from(config: &Config) -> Self {
        Self::new(config.timer.work_duration, config.timer.break_duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_flips() {
        assert_eq!(Mode::Work.opposite(), Mode::Break);
        assert_eq!(Mode::Break.opposite(), Mode::Work);
    }

    #[test]
    fn zero_durations_are_clamped() {
        let d = Durations::new(0, 0);
        assert_eq!(d.for_mode(Mode::Work), 1);
        assert_eq!(d.for_mode(Mode::Break), 1);
    }

    #[test]
    fn mode_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Mode::Break).unwrap(), "\"break\"");
    }
}
