//! The state-owning object behind the display layer.
//!
//! One `Pomodoro` is built per process and handed by reference to whatever
//! renders it. Every user intent is a method here; each one samples the
//! clock once, mutates engine/ledger synchronously, persists, and only then
//! notifies subscribers, so a subscriber always sees committed state.

use crate::clock::{Clock, SystemClock};
use crate::error::{Result, ValidationError};
use crate::events::{ConfirmPrompt, Event};
use crate::ledger::{RenameOutcome, SessionLedger, SessionRecord};
use crate::notify::{completion_message, Cue, Notifier, NullNotifier, NullSoundPlayer, SoundPlayer};
use crate::stats::{self, Stats};
use crate::storage::persisted::{load_sessions, PersistedState, SESSIONS_KEY, STATE_KEY};
use crate::storage::{Config, Database, KvStore};
use crate::tags::TagList;
use crate::timer::{at, Completion, Durations, TimerEngine};
use crate::format::format_clock;

pub type Listener = Box<dyn FnMut(&Event)>;

/// Result of asking to toggle Work/Break.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeSwitch {
    Switched,
    /// The current interval has progress; waiting for confirmation.
    NeedsConfirm,
    /// The timer is running; pause first.
    Refused,
}

pub struct Pomodoro<S: KvStore, C: Clock = SystemClock> {
    store: S,
    clock: C,
    engine: TimerEngine,
    ledger: SessionLedger,
    tags: TagList,
    tag: String,
    note: String,
    show_finish_confirm: bool,
    show_mode_confirm: bool,
    sound_enabled: bool,
    notifications_enabled: bool,
    notifier: Box<dyn Notifier>,
    sound: Box<dyn SoundPlayer>,
    listeners: Vec<Listener>,
}

impl Pomodoro<Database, SystemClock> {
    /// Open the on-disk store in the data directory.
    pub fn open(config: &Config) -> Result<Self> {
        Ok(Self::load(Database::open()?, SystemClock, config))
    }
}

impl<S: KvStore, C: Clock> Pomodoro<S, C> {
    /// Restore from `store`, or start fresh if nothing usable is there.
    ///
    /// Does not tick; call [`Pomodoro::on_visible`] once the display is up
    /// to catch up on time that passed while nothing was running.
    pub fn load(store: S, clock: C, config: &Config) -> Self {
        let durations = config.durations();
        let tags = config.tag_list();
        let mut persisted = PersistedState::load_or_default(&store, &durations, tags.first());
        if !tags.contains(&persisted.tag) {
            persisted.tag = tags.first().to_string();
        }
        let ledger = SessionLedger::from_records(load_sessions(&store));
        tracing::debug!(
            sessions = ledger.len(),
            mode = %persisted.mode,
            running = persisted.is_running,
            "pomodoro restored"
        );

        Self {
            engine: TimerEngine::restore(persisted.timer_state(), durations),
            ledger,
            tags,
            tag: persisted.tag,
            note: persisted.session_note,
            show_finish_confirm: persisted.show_finish_confirm,
            show_mode_confirm: persisted.show_mode_confirm,
            sound_enabled: config.timer.sound_enabled,
            notifications_enabled: config.notifications.enabled,
            notifier: Box::new(NullNotifier),
            sound: Box::new(NullSoundPlayer),
            listeners: Vec::new(),
            store,
            clock,
        }
    }

    pub fn with_notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Box::new(notifier);
        self
    }

    pub fn with_sound(mut self, sound: impl SoundPlayer + 'static) -> Self {
        self.sound = Box::new(sound);
        self
    }

    /// Called after every committed change.
    pub fn subscribe(&mut self, listener: impl FnMut(&Event) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn engine(&self) -> &TimerEngine {
        &self.engine
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn tags(&self) -> &TagList {
        &self.tags
    }

    pub fn note(&self) -> &str {
        &self.note
    }

    pub fn sessions(&self) -> &[SessionRecord] {
        self.ledger.all()
    }

    pub fn ledger(&self) -> &SessionLedger {
        &self.ledger
    }

    pub fn show_finish_confirm(&self) -> bool {
        self.show_finish_confirm
    }

    pub fn show_mode_confirm(&self) -> bool {
        self.show_mode_confirm
    }

    /// Totals, with "today" measured from local midnight.
    pub fn stats(&self) -> Stats {
        stats::aggregate(self.ledger.all(), at(self.clock.now_ms()).with_timezone(&chrono::Local))
    }

    /// The blob that is (or would be) written under [`STATE_KEY`].
    pub fn persisted_state(&self) -> PersistedState {
        PersistedState {
            show_finish_confirm: self.show_finish_confirm,
            show_mode_confirm: self.show_mode_confirm,
            session_note: self.note.clone(),
            ..PersistedState::from_parts(self.engine.state(), &self.tag)
        }
    }

    pub fn snapshot(&self) -> Event {
        let state = self.engine.state();
        Event::StateSnapshot {
            mode: state.mode,
            time_left: state.time_left,
            display: format_clock(state.time_left),
            is_running: state.is_running,
            target_end_time: state.target_end_time,
            progress: self.engine.progress(),
            tag: self.tag.clone(),
            session_note: self.note.clone(),
            show_finish_confirm: self.show_finish_confirm,
            show_mode_confirm: self.show_mode_confirm,
            at: at(self.clock.now_ms()),
        }
    }

    // ── Timer intents ────────────────────────────────────────────────

    pub fn start(&mut self) -> Option<Event> {
        self.tick();
        let now = self.clock.now_ms();
        let event = self.engine.start(now)?;
        if self.notifications_enabled {
            self.notifier.request_permission();
        }
        let closed = self.close_prompts(now);
        self.persist_state();
        closed.into_iter().for_each(|e| self.emit(e));
        self.emit(event.clone());
        Some(event)
    }

    pub fn pause(&mut self) -> Option<Event> {
        // An interval that already expired completes instead of pausing at zero.
        self.tick();
        let event = self.engine.pause(self.clock.now_ms())?;
        self.persist_state();
        self.emit(event.clone());
        Some(event)
    }

    pub fn reset(&mut self) -> Option<Event> {
        let now = self.clock.now_ms();
        let event = self.engine.reset(now)?;
        let closed = self.close_prompts(now);
        self.persist_state();
        closed.into_iter().for_each(|e| self.emit(e));
        self.emit(event.clone());
        Some(event)
    }

    /// Periodic recomputation. Returns the record appended on expiry.
    ///
    /// Safe to call at any rate, including many times after expiry.
    pub fn tick(&mut self) -> Option<SessionRecord> {
        let completion = self.engine.tick(self.clock.now_ms())?;
        Some(self.record(completion))
    }

    /// The display regained focus; recompute right away.
    pub fn on_visible(&mut self) -> Option<SessionRecord> {
        self.tick()
    }

    // ── Early finish ─────────────────────────────────────────────────

    /// Pause and ask for confirmation. Returns whether the prompt opened.
    pub fn request_finish(&mut self) -> bool {
        self.tick();
        let now = self.clock.now_ms();
        let paused = self.engine.pause(now);
        if self.engine.elapsed_secs() == 0 {
            if let Some(event) = paused {
                self.persist_state();
                self.emit(event);
            }
            return false;
        }
        self.show_finish_confirm = true;
        self.persist_state();
        if let Some(event) = paused {
            self.emit(event);
        }
        self.emit(Event::ConfirmChanged {
            prompt: ConfirmPrompt::FinishEarly,
            open: true,
            at: at(now),
        });
        true
    }

    pub fn confirm_finish(&mut self) -> Option<SessionRecord> {
        if !self.show_finish_confirm {
            return None;
        }
        self.show_finish_confirm = false;
        let now = self.clock.now_ms();
        match self.engine.finish_early(now) {
            Some(completion) => Some(self.record(completion)),
            None => {
                self.persist_state();
                self.emit(Event::ConfirmChanged {
                    prompt: ConfirmPrompt::FinishEarly,
                    open: false,
                    at: at(now),
                });
                None
            }
        }
    }

    /// Dismiss the prompt; the timer stays paused.
    pub fn cancel_finish(&mut self) {
        if !self.show_finish_confirm {
            return;
        }
        self.show_finish_confirm = false;
        self.persist_state();
        self.emit(Event::ConfirmChanged {
            prompt: ConfirmPrompt::FinishEarly,
            open: false,
            at: at(self.clock.now_ms()),
        });
    }

    // ── Mode switch ──────────────────────────────────────────────────

    pub fn request_mode_switch(&mut self) -> ModeSwitch {
        self.tick();
        if self.engine.is_running() {
            return ModeSwitch::Refused;
        }
        let now = self.clock.now_ms();
        if self.engine.is_untouched() {
            self.switch_mode(now);
            return ModeSwitch::Switched;
        }
        self.show_mode_confirm = true;
        self.persist_state();
        self.emit(Event::ConfirmChanged {
            prompt: ConfirmPrompt::ModeSwitch,
            open: true,
            at: at(now),
        });
        ModeSwitch::NeedsConfirm
    }

    pub fn confirm_mode_switch(&mut self) -> bool {
        if !self.show_mode_confirm || self.engine.is_running() {
            return false;
        }
        self.show_mode_confirm = false;
        self.switch_mode(self.clock.now_ms())
    }

    pub fn cancel_mode_switch(&mut self) {
        if !self.show_mode_confirm {
            return;
        }
        self.show_mode_confirm = false;
        self.persist_state();
        self.emit(Event::ConfirmChanged {
            prompt: ConfirmPrompt::ModeSwitch,
            open: false,
            at: at(self.clock.now_ms()),
        });
    }

    // ── Tags, note, settings ─────────────────────────────────────────

    pub fn select_tag(&mut self, tag: &str) -> Result<(), ValidationError> {
        if !self.tags.contains(tag) {
            return Err(ValidationError::UnknownTag(tag.to_string()));
        }
        if self.tag != tag {
            self.tag = tag.to_string();
            self.persist_state();
            self.emit(Event::TagSelected {
                tag: self.tag.clone(),
            });
        }
        Ok(())
    }

    pub fn add_tag(&mut self, tag: &str) -> Result<String, ValidationError> {
        let tag = self.tags.add(tag)?;
        self.emit(Event::TagAdded { tag: tag.clone() });
        Ok(tag)
    }

    /// Rename in the tag list, across history, and on the active tag.
    pub fn rename_tag(&mut self, old: &str, new: &str) -> Result<RenameOutcome, ValidationError> {
        let new = self.tags.rename(old, new)?;
        let outcome = self.ledger.rename_tag(old, &new, &self.tag);
        if outcome.active_tag_affected {
            self.tag = new.clone();
        }
        if outcome.renamed > 0 || outcome.active_tag_affected {
            self.persist_all();
        }
        if old != new {
            self.emit(Event::TagRenamed {
                from: old.to_string(),
                to: new,
                sessions_updated: outcome.renamed,
            });
        }
        Ok(outcome)
    }

    /// Remove from the list. History keeps the label.
    pub fn remove_tag(&mut self, tag: &str) -> Result<(), ValidationError> {
        self.tags.remove(tag)?;
        if self.tag == tag {
            self.tag = self.tags.first().to_string();
            self.persist_state();
        }
        self.emit(Event::TagRemoved {
            tag: tag.to_string(),
            active_tag: self.tag.clone(),
        });
        Ok(())
    }

    /// Set the note that the next recorded session will carry.
    pub fn set_note(&mut self, note: &str) {
        if self.note == note {
            return;
        }
        self.note = note.to_string();
        self.persist_state();
        self.emit(Event::NoteChanged {
            note: self.note.clone(),
        });
    }

    /// Take new settings from the provider.
    pub fn apply_settings(&mut self, config: &Config) {
        let durations = Durations::from(config);
        let rebaselined = self.engine.set_durations(durations);
        self.sound_enabled = config.timer.sound_enabled;
        self.notifications_enabled = config.notifications.enabled;
        if rebaselined {
            self.persist_state();
        }
        self.emit(Event::SettingsApplied {
            work_secs: durations.work_secs,
            break_secs: durations.break_secs,
            sound_enabled: self.sound_enabled,
            rebaselined,
        });
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn switch_mode(&mut self, now: u64) -> bool {
        let Some(event) = self.engine.switch_mode(now) else {
            return false;
        };
        self.persist_state();
        self.emit(event);
        true
    }

    /// Append the finished interval, fire side channels, persist, announce.
    fn record(&mut self, completion: Completion) -> SessionRecord {
        let note = Some(std::mem::take(&mut self.note));
        let record = SessionRecord::from_completion(&completion, &self.tag, note);
        self.ledger.append(record.clone());
        self.show_finish_confirm = false;
        self.show_mode_confirm = false;

        if completion.completed {
            if self.sound_enabled {
                self.sound.play(Cue::for_ended(completion.mode));
            }
            if self.notifications_enabled {
                let (title, body) = completion_message(completion.mode);
                self.notifier.notify(title, body);
            }
        }

        self.persist_all();
        self.emit(Event::TimerCompleted {
            mode: completion.mode,
            next_mode: self.engine.mode(),
            completed: completion.completed,
            duration_secs: completion.duration_secs,
            at: at(completion.at_ms),
        });
        self.emit(Event::SessionRecorded {
            record: record.clone(),
        });
        record
    }

    /// Lower any open prompt, returning the events to emit once persisted.
    fn close_prompts(&mut self, now: u64) -> Vec<Event> {
        [
            (std::mem::take(&mut self.show_finish_confirm), ConfirmPrompt::FinishEarly),
            (std::mem::take(&mut self.show_mode_confirm), ConfirmPrompt::ModeSwitch),
        ]
        .into_iter()
        .filter(|(was_open, _)| *was_open)
        .map(|(_, prompt)| Event::ConfirmChanged {
            prompt,
            open: false,
            at: at(now),
        })
        .collect()
    }

    fn persist_state(&self) {
        let state = self.persisted_state();
        let result = serde_json::to_string(&state)
            .map_err(|e| e.to_string())
            .and_then(|json| self.store.set(STATE_KEY, &json).map_err(|e| e.to_string()));
        if let Err(error) = result {
            tracing::error!(%error, "failed to persist timer state");
        }
    }

    /// State blob and session log in one write.
    fn persist_all(&self) {
        let state = self.persisted_state();
        let result = serde_json::to_string(&state)
            .and_then(|s| Ok((s, serde_json::to_string(self.ledger.all())?)))
            .map_err(|e| e.to_string())
            .and_then(|(state_json, sessions_json)| {
                self.store
                    .set_many(&[(STATE_KEY, state_json.as_str()), (SESSIONS_KEY, sessions_json.as_str())])
                    .map_err(|e| e.to_string())
            });
        if let Err(error) = result {
            tracing::error!(%error, "failed to persist sessions");
        }
    }

    fn emit(&mut self, event: Event) {
        for listener in &mut self.listeners {
            listener(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::MemoryStore;
    use crate::timer::Mode;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    const T0: u64 = 1_700_000_000_000;

    #[derive(Clone, Default)]
    struct RecordingSound(Rc<RefCell<Vec<Cue>>>);

    impl SoundPlayer for RecordingSound {
        fn play(&mut self, cue: Cue) {
            self.0.borrow_mut().push(cue);
        }
    }

    #[derive(Clone, Default)]
    struct RecordingNotifier {
        permission_requests: Rc<Cell<usize>>,
        titles: Rc<RefCell<Vec<String>>>,
    }

    impl Notifier for RecordingNotifier {
        fn request_permission(&mut self) {
            self.permission_requests.set(self.permission_requests.get() + 1);
        }

        fn notify(&mut self, title: &str, _body: &str) {
            self.titles.borrow_mut().push(title.to_string());
        }
    }

    fn with_side_channels(
        config: &Config,
    ) -> (Pomodoro<MemoryStore, ManualClock>, ManualClock, RecordingSound, RecordingNotifier) {
        let clock = ManualClock::new(T0);
        let sound = RecordingSound::default();
        let notifier = RecordingNotifier::default();
        let p = Pomodoro::load(MemoryStore::new(), clock.clone(), config)
            .with_sound(sound.clone())
            .with_notifier(notifier.clone());
        (p, clock, sound, notifier)
    }

    fn pomodoro() -> (Pomodoro<MemoryStore, ManualClock>, ManualClock) {
        let clock = ManualClock::new(T0);
        let p = Pomodoro::load(MemoryStore::new(), clock.clone(), &Config::default());
        (p, clock)
    }

    #[test]
    fn fresh_start_is_idle_work() {
        let (p, _) = pomodoro();
        assert_eq!(p.engine().mode(), Mode::Work);
        assert_eq!(p.engine().time_left(), 1500);
        assert_eq!(p.tag(), "Work");
    }

    #[test]
    fn subscribers_see_committed_state() {
        let (mut p, clock) = pomodoro();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        p.subscribe(move |e| sink.borrow_mut().push(e.clone()));
        p.start();
        clock.advance_secs(1500);
        p.tick();
        let seen = seen.borrow();
        assert!(matches!(seen[0], Event::TimerStarted { .. }));
        assert!(matches!(seen[1], Event::TimerCompleted { completed: true, .. }));
        assert!(matches!(seen[2], Event::SessionRecorded { .. }));
    }

    #[test]
    fn note_is_consumed_by_record() {
        let (mut p, clock) = pomodoro();
        p.set_note("wrote the parser");
        p.start();
        clock.advance_secs(1500);
        let record = p.tick().expect("record");
        assert_eq!(record.note.as_deref(), Some("wrote the parser"));
        assert_eq!(p.note(), "");
    }

    #[test]
    fn cancel_finish_leaves_timer_paused() {
        let (mut p, clock) = pomodoro();
        p.start();
        clock.advance_secs(30);
        assert!(p.request_finish());
        p.cancel_finish();
        assert!(!p.show_finish_confirm());
        assert!(!p.engine().is_running());
        assert_eq!(p.engine().time_left(), 1470);
        assert!(p.sessions().is_empty());
    }

    #[test]
    fn confirm_without_request_is_noop() {
        let (mut p, clock) = pomodoro();
        p.start();
        clock.advance_secs(30);
        assert!(p.confirm_finish().is_none());
        assert!(p.engine().is_running());
    }

    #[test]
    fn request_finish_with_nothing_elapsed_does_not_prompt() {
        let (mut p, _) = pomodoro();
        assert!(!p.request_finish());
        assert!(!p.show_finish_confirm());
    }

    #[test]
    fn mode_switch_rules() {
        let (mut p, clock) = pomodoro();
        assert_eq!(p.request_mode_switch(), ModeSwitch::Switched);
        assert_eq!(p.engine().mode(), Mode::Break);

        p.start();
        assert_eq!(p.request_mode_switch(), ModeSwitch::Refused);

        clock.advance_secs(10);
        p.pause();
        assert_eq!(p.request_mode_switch(), ModeSwitch::NeedsConfirm);
        assert!(p.show_mode_confirm());
        assert!(p.confirm_mode_switch());
        assert_eq!(p.engine().mode(), Mode::Work);
        assert!(!p.show_mode_confirm());
    }

    #[test]
    fn rename_updates_history_and_active_tag() {
        let (mut p, clock) = pomodoro();
        p.start();
        clock.advance_secs(1500);
        p.tick();
        let outcome = p.rename_tag("Work", "Focus").unwrap();
        assert_eq!(outcome.renamed, 1);
        assert_eq!(p.tag(), "Focus");
        assert_eq!(p.sessions()[0].tag, "Focus");
        assert!(p.tags().contains("Focus"));
    }

    #[test]
    fn invalid_tag_input_is_rejected() {
        let (mut p, _) = pomodoro();
        assert_eq!(p.select_tag("Nope"), Err(ValidationError::UnknownTag("Nope".into())));
        assert_eq!(p.rename_tag("Work", " "), Err(ValidationError::EmptyTag));
        assert_eq!(p.add_tag("Study"), Err(ValidationError::DuplicateTag("Study".into())));
    }

    #[test]
    fn removing_active_tag_falls_back_and_orphans_history() {
        let (mut p, clock) = pomodoro();
        p.select_tag("Study").unwrap();
        p.start();
        clock.advance_secs(1500);
        p.tick();
        p.remove_tag("Study").unwrap();
        assert_eq!(p.tag(), "Work");
        assert_eq!(p.sessions()[0].tag, "Study");
    }

    #[test]
    fn settings_rebaseline_idle_timer() {
        let (mut p, _) = pomodoro();
        let mut config = Config::default();
        config.timer.work_duration = 3000;
        p.apply_settings(&config);
        assert_eq!(p.engine().time_left(), 3000);
    }

    #[test]
    fn storage_failures_do_not_interrupt_the_timer() {
        let store = MemoryStore::new();
        let clock = ManualClock::new(T0);
        let mut p = Pomodoro::load(store.clone(), clock.clone(), &Config::default());
        store.set_failing(true);
        p.start();
        clock.advance_secs(1500);
        assert!(p.tick().is_some());
        assert_eq!(p.sessions().len(), 1);
        assert_eq!(p.engine().mode(), Mode::Break);
    }

    #[test]
    fn expiry_plays_cue_and_notifies() {
        let (mut p, clock, sound, notifier) = with_side_channels(&Config::default());
        p.start();
        clock.advance_secs(1500);
        p.tick();
        assert_eq!(*sound.0.borrow(), [Cue::WorkComplete]);
        assert_eq!(*notifier.titles.borrow(), ["Work session complete"]);

        p.start();
        clock.advance_secs(300);
        p.tick();
        assert_eq!(*sound.0.borrow(), [Cue::WorkComplete, Cue::BreakComplete]);
        assert_eq!(notifier.titles.borrow().len(), 2);
    }

    #[test]
    fn disabled_sound_stays_silent() {
        let mut config = Config::default();
        config.timer.sound_enabled = false;
        let (mut p, clock, sound, notifier) = with_side_channels(&config);
        p.start();
        clock.advance_secs(1500);
        assert!(p.tick().is_some());
        assert!(sound.0.borrow().is_empty());
        assert_eq!(notifier.titles.borrow().len(), 1);
    }

    #[test]
    fn disabled_notifications_send_nothing() {
        let mut config = Config::default();
        config.notifications.enabled = false;
        let (mut p, clock, sound, notifier) = with_side_channels(&config);
        p.start();
        clock.advance_secs(1500);
        p.tick();
        assert_eq!(notifier.permission_requests.get(), 0);
        assert!(notifier.titles.borrow().is_empty());
        assert_eq!(sound.0.borrow().len(), 1);
    }

    #[test]
    fn early_finish_fires_no_side_channels() {
        let (mut p, clock, sound, notifier) = with_side_channels(&Config::default());
        p.start();
        clock.advance_secs(30);
        assert!(p.request_finish());
        assert!(p.confirm_finish().is_some());
        assert!(sound.0.borrow().is_empty());
        assert!(notifier.titles.borrow().is_empty());
    }

    #[test]
    fn each_start_requests_permission() {
        let (mut p, clock, _, notifier) = with_side_channels(&Config::default());
        p.start();
        clock.advance_secs(5);
        p.start();
        assert_eq!(notifier.permission_requests.get(), 1);
        p.pause();
        p.start();
        assert_eq!(notifier.permission_requests.get(), 2);
    }
}
