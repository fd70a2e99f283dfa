pub mod config;
pub mod stats;
pub mod tag;
pub mod timer;

use std::io::Write;

use tempo_core::{Config, Cue, Database, Notifier, Pomodoro, SoundPlayer, SystemClock};

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

pub type App = Pomodoro<Database, SystemClock>;

/// Open the store and restore the timer, catching up on elapsed time.
///
/// A completion that happened while no process was running is reported on
/// stderr so it is not silently folded into the output.
pub fn open_app(config: &Config) -> Result<App, Box<dyn std::error::Error>> {
    let mut app = Pomodoro::open(config)?
        .with_notifier(TerminalNotifier)
        .with_sound(TerminalBell);
    tracing::debug!(sessions = app.sessions().len(), "store opened");
    if let Some(record) = app.on_visible() {
        eprintln!(
            "{} interval finished while away ({})",
            record.mode.map(|m| m.label()).unwrap_or("Previous"),
            tempo_core::format::format_duration(record.duration)
        );
    }
    Ok(app)
}

/// Write tags edited through the app back to the config file.
pub fn save_tags(config: &mut Config, app: &App) -> CliResult {
    config.tags = app.tags().as_slice().to_vec();
    config.save()?;
    Ok(())
}

pub fn print_json<T: serde::Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Notifications on a terminal are a line on stderr.
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&mut self, title: &str, body: &str) {
        let _ = writeln!(std::io::stderr(), "{title}: {body}");
    }
}

/// The audio cue is the terminal bell; one ring for work, two for break.
pub struct TerminalBell;

impl SoundPlayer for TerminalBell {
    fn play(&mut self, cue: Cue) {
        let bell = match cue {
            Cue::WorkComplete => "\x07",
            Cue::BreakComplete => "\x07\x07",
        };
        let mut err = std::io::stderr();
        let _ = err.write_all(bell.as_bytes()).and_then(|_| err.flush());
    }
}
