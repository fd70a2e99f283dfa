//! Side channels fired when an interval ends.
//!
//! Both are best effort. Implementations swallow their own failures; the
//! timer never waits on them or learns whether they worked.

use crate::timer::Mode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    WorkComplete,
    BreakComplete,
}

impl Cue {
    pub fn for_ended(mode: Mode) -> Self {
        match mode {
            Mode::Work => Cue::WorkComplete,
            Mode::Break => Cue::BreakComplete,
        }
    }
}

/// OS-level notifications.
pub trait Notifier {
    /// Called on the direct user gesture that starts the timer.
    fn request_permission(&mut self) {}

    fn notify(&mut self, title: &str, body: &str);
}

pub trait SoundPlayer {
    fn play(&mut self, cue: Cue);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&mut self, _title: &str, _body: &str) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullSoundPlayer;

impl SoundPlayer for NullSoundPlayer {
    fn play(&mut self, _cue: Cue) {}
}

/// Title and body for the notification sent when `ended` finishes.
pub fn completion_message(ended: Mode) -> (&'static str, &'static str) {
    match ended {
        Mode::Work => ("Work session complete", "Time for a break."),
        Mode::Break => ("Break is over", "Ready to get back to work?"),
    }
}
