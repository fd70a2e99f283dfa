use std::io::Write;
use std::time::Duration;

use clap::{Args, Subcommand};
use tempo_core::format::{format_clock, format_duration};
use tempo_core::{Config, ModeSwitch};

use super::{open_app, print_json, App, CliResult};

#[derive(Subcommand)]
pub enum TimerAction {
    /// Print current timer state as JSON
    Status,
    /// Start (or resume) the countdown
    Start,
    /// Pause the countdown
    Pause,
    /// Stop and restore the full interval for the current mode
    Reset,
    /// Toggle between work and break (timer must be paused)
    Switch(Confirmation),
    /// Finish the current interval early and record it
    Finish(Confirmation),
    /// Set the note attached to the next recorded session
    Note {
        /// Note text; empty clears it
        text: String,
    },
    /// Follow the running countdown until it ends or Ctrl-C
    Watch,
}

#[derive(Args)]
pub struct Confirmation {
    /// Confirm the pending request
    #[arg(long, conflicts_with = "cancel")]
    confirm: bool,
    /// Dismiss the pending request
    #[arg(long)]
    cancel: bool,
}

pub fn run(action: TimerAction) -> CliResult {
    let config = Config::load_or_default();
    let mut app = open_app(&config)?;

    match action {
        TimerAction::Status => {}
        TimerAction::Start => {
            app.start();
        }
        TimerAction::Pause => {
            app.pause();
        }
        TimerAction::Reset => {
            app.reset();
        }
        TimerAction::Switch(c) => {
            if c.confirm {
                if !app.confirm_mode_switch() {
                    eprintln!("no mode switch pending");
                }
            } else if c.cancel {
                app.cancel_mode_switch();
            } else {
                match app.request_mode_switch() {
                    ModeSwitch::Switched => {}
                    ModeSwitch::NeedsConfirm => eprintln!(
                        "current interval has progress; run `tempo timer switch --confirm` to switch anyway"
                    ),
                    ModeSwitch::Refused => return Err("pause the timer before switching mode".into()),
                }
            }
        }
        TimerAction::Finish(c) => {
            if c.confirm {
                match app.confirm_finish() {
                    Some(record) => print_json(&record)?,
                    None => eprintln!("no early finish pending"),
                }
            } else if c.cancel {
                app.cancel_finish();
            } else if app.request_finish() {
                eprintln!(
                    "finish now and record {}? run `tempo timer finish --confirm` or `--cancel`",
                    format_duration(app.engine().elapsed_secs())
                );
            } else {
                eprintln!("nothing to finish");
            }
        }
        TimerAction::Note { text } => app.set_note(&text),
        TimerAction::Watch => return watch(app),
    }

    print_json(&app.snapshot())
}

fn watch(mut app: App) -> CliResult {
    if !app.engine().is_running() {
        eprintln!("timer is not running");
        return print_json(&app.snapshot());
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        let mut out = std::io::stdout();
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Some(record) = app.tick() {
                        println!();
                        print_json(&record)?;
                        break;
                    }
                    let engine = app.engine();
                    write!(
                        out,
                        "\r{} {} [{}] ",
                        format_clock(engine.time_left()),
                        engine.mode(),
                        app.tag()
                    )?;
                    out.flush()?;
                }
                _ = tokio::signal::ctrl_c() => {
                    println!();
                    break;
                }
            }
        }
        Ok::<_, Box<dyn std::error::Error>>(())
    })?;

    print_json(&app.snapshot())
}
