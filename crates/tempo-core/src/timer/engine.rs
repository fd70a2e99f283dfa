//! Timer engine implementation.
//!
//! The timer engine is a wall-clock-based state machine. It does not use
//! internal threads and it never reads the clock itself - the caller passes
//! `now_ms` into every command and is responsible for calling `tick()`
//! periodically (and eagerly whenever the display regains focus).
//!
//! While running, the source of truth is `target_end_time`; `time_left` is a
//! cached projection of it. Skipping ticks, or suspending the process for an
//! hour, therefore never gains or loses time.
//!
//! ## State Transitions
//!
//! ```text
//! Stopped -> Running -> Stopped          (pause)
//! Running -> Stopped(opposite mode)      (expiry, exactly once)
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = TimerEngine::new(Durations::default());
//! engine.start(clock.now_ms());
//! // In a loop:
//! if let Some(done) = engine.tick(clock.now_ms()) { /* record it */ }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::mode::{Durations, Mode};
use crate::events::Event;

/// Everything needed to resume the countdown after a restart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimerState {
    pub mode: Mode,
    /// Seconds remaining in the current interval.
    pub time_left: u64,
    pub is_running: bool,
    /// Absolute expiry in ms since epoch. Set iff `is_running`.
    pub target_end_time: Option<u64>,
    /// Length the current interval started with. Settings changed
    /// mid-interval do not move it, so elapsed time stays exact.
    pub interval_secs: u64,
    /// Last paused value for each mode, restored on a manual mode switch.
    pub work_time_left: Option<u64>,
    pub break_time_left: Option<u64>,
}

impl TimerState {
    pub fn fresh(durations: &Durations) -> Self {
        Self {
            mode: Mode::Work,
            time_left: durations.work_secs,
            is_running: false,
            target_end_time: None,
            interval_secs: durations.work_secs,
            work_time_left: None,
            break_time_left: None,
        }
    }

    /// Repair a state that violates the running/target invariant, and fill
    /// in an interval length older blobs did not carry.
    fn normalized(mut self, durations: &Durations) -> Self {
        if self.interval_secs < self.time_left || self.interval_secs == 0 {
            self.interval_secs = durations.for_mode(self.mode).max(self.time_left);
        }
        match (self.is_running, self.target_end_time) {
            (true, None) => {
                tracing::warn!("restored timer was running without a target; stopping it");
                self.is_running = false;
            }
            (false, Some(_)) => self.target_end_time = None,
            _ => {}
        }
        self
    }

    fn remembered_mut(&mut self, mode: Mode) -> &mut Option<u64> {
        match mode {
            Mode::Work => &mut self.work_time_left,
            Mode::Break => &mut self.break_time_left,
        }
    }
}

impl Default for TimerState {
    fn default() -> Self {
        Self::fresh(&Durations::default())
    }
}

/// A finished interval, handed to whoever keeps the session log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    /// The mode that just ended.
    pub mode: Mode,
    /// Seconds to record.
    pub duration_secs: u64,
    /// `true` on natural expiry, `false` on an early finish.
    pub completed: bool,
    pub at_ms: u64,
}

/// Core timer engine.
///
/// Operates on wall-clock deltas -- no internal thread.
#[derive(Debug, Clone)]
pub struct TimerEngine {
    state: TimerState,
    durations: Durations,
}

impl TimerEngine {
    /// Create a fresh engine sitting at the start of a Work interval.
    pub fn new(durations: Durations) -> Self {
        Self {
            state: TimerState::fresh(&durations),
            durations,
        }
    }

    /// Resume from a persisted state.
    ///
    /// A running state whose target has already passed is kept as-is; the
    /// first `tick()` performs the (single) completion.
    pub fn restore(state: TimerState, durations: Durations) -> Self {
        Self {
            state: state.normalized(&durations),
            durations,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> &TimerState {
        &self.state
    }

    pub fn mode(&self) -> Mode {
        self.state.mode
    }

    pub fn time_left(&self) -> u64 {
        self.state.time_left
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running
    }

    pub fn target_end_time(&self) -> Option<u64> {
        self.state.target_end_time
    }

    pub fn durations(&self) -> Durations {
        self.durations
    }

    /// Length the current interval started with.
    pub fn interval_secs(&self) -> u64 {
        self.state.interval_secs
    }

    /// Seconds spent in the current interval according to `time_left`.
    pub fn elapsed_secs(&self) -> u64 {
        self.state.interval_secs.saturating_sub(self.state.time_left)
    }

    /// Stopped with the whole interval still ahead.
    pub fn is_untouched(&self) -> bool {
        !self.state.is_running && self.state.time_left == self.state.interval_secs
    }

    /// 0.0 .. 1.0 progress within the current interval.
    pub fn progress(&self) -> f64 {
        let total = self.state.interval_secs;
        if total == 0 {
            return 0.0;
        }
        (self.elapsed_secs() as f64 / total as f64).min(1.0)
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self, now_ms: u64) -> Option<Event> {
        if self.state.is_running {
            return None;
        }
        let target = now_ms.saturating_add(self.state.time_left.saturating_mul(1000));
        self.state.is_running = true;
        self.state.target_end_time = Some(target);
        tracing::debug!(mode = %self.state.mode, time_left = self.state.time_left, target_end_time = target, "timer started");
        Some(Event::TimerStarted {
            mode: self.state.mode,
            time_left: self.state.time_left,
            target_end_time: target,
            at: at(now_ms),
        })
    }

    pub fn pause(&mut self, now_ms: u64) -> Option<Event> {
        let target = self.state.target_end_time.filter(|_| self.state.is_running)?;
        self.state.time_left = remaining_secs(target, now_ms);
        self.state.is_running = false;
        self.state.target_end_time = None;
        let mode = self.state.mode;
        *self.state.remembered_mut(mode) = Some(self.state.time_left);
        tracing::debug!(mode = %mode, time_left = self.state.time_left, "timer paused");
        Some(Event::TimerPaused {
            mode,
            time_left: self.state.time_left,
            at: at(now_ms),
        })
    }

    pub fn reset(&mut self, now_ms: u64) -> Option<Event> {
        let mode = self.state.mode;
        self.state.is_running = false;
        self.state.target_end_time = None;
        self.state.time_left = self.durations.for_mode(mode);
        self.state.interval_secs = self.state.time_left;
        *self.state.remembered_mut(mode) = None;
        Some(Event::TimerReset {
            mode,
            time_left: self.state.time_left,
            at: at(now_ms),
        })
    }

    /// Recompute `time_left` from the wall-clock target.
    ///
    /// Returns the completion exactly once per expiry: the transition stops
    /// the timer, so later ticks have nothing to do.
    pub fn tick(&mut self, now_ms: u64) -> Option<Completion> {
        let target = self.state.target_end_time.filter(|_| self.state.is_running)?;
        self.state.time_left = remaining_secs(target, now_ms);
        if self.state.time_left > 0 {
            return None;
        }

        let ended = self.state.mode;
        let next = ended.opposite();
        let completion = Completion {
            mode: ended,
            duration_secs: self.state.interval_secs,
            completed: true,
            at_ms: now_ms,
        };
        self.state.mode = next;
        self.state.time_left = self.durations.for_mode(next);
        self.state.interval_secs = self.state.time_left;
        self.state.is_running = false;
        self.state.target_end_time = None;
        self.state.work_time_left = None;
        self.state.break_time_left = None;
        tracing::debug!(ended = %ended, next = %next, "interval expired");
        Some(completion)
    }

    /// End the current interval before expiry.
    ///
    /// Always leaves the engine reset to the current mode's default; returns
    /// `None` when nothing has elapsed, since there is nothing to record.
    pub fn finish_early(&mut self, now_ms: u64) -> Option<Completion> {
        self.pause(now_ms);
        let duration_secs = self.elapsed_secs();
        let mode = self.state.mode;
        self.reset(now_ms);
        (duration_secs > 0).then_some(Completion {
            mode,
            duration_secs,
            completed: false,
            at_ms: now_ms,
        })
    }

    /// Swap Work/Break. Refused while running.
    pub fn switch_mode(&mut self, now_ms: u64) -> Option<Event> {
        if self.state.is_running {
            return None;
        }
        let from = self.state.mode;
        let to = from.opposite();
        let current = self.state.time_left;
        // Parked progress is only kept while it is measured against the
        // current settings; see `set_durations`.
        let parkable = self.state.interval_secs == self.durations.for_mode(from);
        *self.state.remembered_mut(from) = Some(current).filter(|&t| t > 0 && parkable);
        self.state.mode = to;
        self.state.interval_secs = self.durations.for_mode(to);
        self.state.time_left = self
            .state
            .remembered_mut(to)
            .take()
            .filter(|&t| t <= self.state.interval_secs)
            .unwrap_or(self.state.interval_secs);
        Some(Event::ModeSwitched {
            from,
            to,
            time_left: self.state.time_left,
            at: at(now_ms),
        })
    }

    /// Apply new configured durations.
    ///
    /// Re-baselines `time_left` only when stopped with nothing elapsed; a
    /// running or partially used interval keeps its own length. Progress
    /// parked in the other mode is dropped when that mode's length changes.
    /// Returns whether `time_left` changed.
    pub fn set_durations(&mut self, durations: Durations) -> bool {
        let previous = std::mem::replace(&mut self.durations, durations);
        let mode = self.state.mode;
        for parked in [Mode::Work, Mode::Break] {
            let changed = previous.for_mode(parked) != durations.for_mode(parked);
            let slot = self.state.remembered_mut(parked);
            if *slot == Some(previous.for_mode(parked)) || (parked != mode && changed) {
                *slot = None;
            }
        }
        if self.is_untouched() {
            let before = self.state.time_left;
            self.state.time_left = durations.for_mode(mode);
            self.state.interval_secs = self.state.time_left;
            return self.state.time_left != before;
        }
        false
    }
}

/// `ceil((target - now) / 1000)`, clamped at zero.
pub fn remaining_secs(target_ms: u64, now_ms: u64) -> u64 {
    target_ms.saturating_sub(now_ms).div_ceil(1000)
}

pub(crate) fn at(now_ms: u64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(now_ms as i64).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: u64 = 1_700_000_000_000;

    fn engine() -> TimerEngine {
        TimerEngine::new(Durations::new(1500, 300))
    }

    #[test]
    fn start_sets_target_from_time_left() {
        let mut e = engine();
        assert!(e.start(T0).is_some());
        assert!(e.is_running());
        assert_eq!(e.target_end_time(), Some(T0 + 1_500_000));
    }

    #[test]
    fn start_while_running_is_noop() {
        let mut e = engine();
        e.start(T0);
        assert!(e.start(T0 + 5_000).is_none());
        assert_eq!(e.target_end_time(), Some(T0 + 1_500_000));
    }

    #[test]
    fn pause_while_paused_is_noop() {
        let mut e = engine();
        assert!(e.pause(T0).is_none());
        assert_eq!(e.time_left(), 1500);
    }

    #[test]
    fn tick_rounds_up_partial_seconds() {
        let mut e = engine();
        e.start(T0);
        assert!(e.tick(T0 + 1).is_none());
        assert_eq!(e.time_left(), 1500);
        e.tick(T0 + 1_000);
        assert_eq!(e.time_left(), 1499);
        e.tick(T0 + 1_001);
        assert_eq!(e.time_left(), 1499);
    }

    #[test]
    fn pause_commits_remaining_and_clears_target() {
        let mut e = engine();
        e.start(T0);
        e.pause(T0 + 10_000);
        assert!(!e.is_running());
        assert_eq!(e.target_end_time(), None);
        assert_eq!(e.time_left(), 1490);
        assert_eq!(e.state().work_time_left, Some(1490));
    }

    #[test]
    fn expiry_flips_mode_and_stops() {
        let mut e = engine();
        e.start(T0);
        let done = e.tick(T0 + 1_500_000).expect("completion");
        assert_eq!(done.mode, Mode::Work);
        assert_eq!(done.duration_secs, 1500);
        assert!(done.completed);
        assert_eq!(e.mode(), Mode::Break);
        assert_eq!(e.time_left(), 300);
        assert!(!e.is_running());
        assert!(e.tick(T0 + 1_600_000).is_none());
    }

    #[test]
    fn reset_restores_default_for_mode() {
        let mut e = engine();
        e.start(T0);
        e.pause(T0 + 42_000);
        e.reset(T0 + 43_000);
        assert_eq!(e.time_left(), 1500);
        assert_eq!(e.state().work_time_left, None);
    }

    #[test]
    fn finish_early_reports_elapsed() {
        let mut e = engine();
        e.start(T0);
        let done = e.finish_early(T0 + 10_000).expect("completion");
        assert_eq!(done.duration_secs, 10);
        assert!(!done.completed);
        assert_eq!(e.time_left(), 1500);
        assert!(!e.is_running());
    }

    #[test]
    fn finish_early_with_nothing_elapsed_records_nothing() {
        let mut e = engine();
        assert!(e.finish_early(T0).is_none());
    }

    #[test]
    fn switch_mode_refused_while_running() {
        let mut e = engine();
        e.start(T0);
        assert!(e.switch_mode(T0 + 1_000).is_none());
        assert_eq!(e.mode(), Mode::Work);
    }

    #[test]
    fn switch_mode_restores_remembered_time() {
        let mut e = engine();
        e.start(T0);
        e.pause(T0 + 100_000);
        e.switch_mode(T0 + 100_000);
        assert_eq!(e.mode(), Mode::Break);
        assert_eq!(e.time_left(), 300);
        e.switch_mode(T0 + 100_000);
        assert_eq!(e.mode(), Mode::Work);
        assert_eq!(e.time_left(), 1400);
    }

    #[test]
    fn durations_rebaseline_only_untouched_timer() {
        let mut e = engine();
        assert!(e.set_durations(Durations::new(3000, 600)));
        assert_eq!(e.time_left(), 3000);

        e.start(T0);
        e.pause(T0 + 5_000);
        assert!(!e.set_durations(Durations::new(1200, 600)));
        assert_eq!(e.time_left(), 2995);
    }

    #[test]
    fn durations_do_not_touch_running_timer() {
        let mut e = engine();
        e.start(T0);
        e.set_durations(Durations::new(60, 60));
        assert_eq!(e.target_end_time(), Some(T0 + 1_500_000));
        e.tick(T0 + 60_000);
        assert_eq!(e.time_left(), 1440);
    }

    #[test]
    fn finish_early_after_settings_change_records_time_spent() {
        for new_work in [3000, 60] {
            let mut e = engine();
            e.start(T0);
            e.pause(T0 + 10_000);
            e.set_durations(Durations::new(new_work, 300));
            assert_eq!(e.interval_secs(), 1500);
            assert_eq!(e.elapsed_secs(), 10);
            assert!(!e.is_untouched());

            let done = e.finish_early(T0 + 20_000).expect("completion");
            assert_eq!(done.duration_secs, 10);
            assert_eq!(e.time_left(), new_work);
            assert_eq!(e.interval_secs(), new_work);
        }
    }

    #[test]
    fn expiry_records_the_interval_that_ran() {
        let mut e = engine();
        e.start(T0);
        e.set_durations(Durations::new(60, 300));
        let done = e.tick(T0 + 1_500_000).expect("completion");
        assert_eq!(done.duration_secs, 1500);
    }

    #[test]
    fn parked_progress_dropped_when_its_length_changes() {
        let mut e = engine();
        e.start(T0);
        e.pause(T0 + 100_000);
        e.switch_mode(T0 + 100_000);
        e.set_durations(Durations::new(1200, 300));
        e.switch_mode(T0 + 100_000);
        assert_eq!(e.mode(), Mode::Work);
        assert_eq!(e.time_left(), 1200);
        assert!(e.is_untouched());
    }

    #[test]
    fn restore_fills_missing_interval_length() {
        let state = TimerState {
            time_left: 1200,
            interval_secs: 0,
            ..TimerState::default()
        };
        let e = TimerEngine::restore(state, Durations::default());
        assert_eq!(e.interval_secs(), 1500);
        assert_eq!(e.elapsed_secs(), 300);
    }

    #[test]
    fn restore_repairs_running_without_target() {
        let state = TimerState {
            is_running: true,
            target_end_time: None,
            ..TimerState::default()
        };
        let e = TimerEngine::restore(state, Durations::default());
        assert!(!e.is_running());
    }

    #[test]
    fn remaining_secs_clamps_at_zero() {
        assert_eq!(remaining_secs(T0, T0 + 5_000), 0);
        assert_eq!(remaining_secs(T0 + 1, T0), 1);
    }
}
