use clap::Subcommand;
use tempo_core::format::format_duration;
use tempo_core::Config;

use super::{open_app, print_json, CliResult};

#[derive(Subcommand)]
pub enum StatsAction {
    /// Totals and per-tag breakdown as JSON
    Summary,
    /// Recent sessions, newest first
    History {
        /// How many sessions to show
        #[arg(long, default_value = "20")]
        limit: usize,
    },
}

pub fn run(action: StatsAction) -> CliResult {
    let config = Config::load_or_default();
    let app = open_app(&config)?;

    match action {
        StatsAction::Summary => print_json(&app.stats())?,
        StatsAction::History { limit } => {
            for record in app.ledger().recent(limit) {
                let when = chrono::DateTime::from_timestamp_millis(record.timestamp as i64)
                    .map(|t| t.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_default();
                let status = if record.completed { "completed" } else { "finished early" };
                let note = record
                    .note
                    .as_deref()
                    .map(|n| format!(" - {n}"))
                    .unwrap_or_default();
                println!(
                    "{when}  {:<12} {:>12}  {status}{note}",
                    record.tag,
                    format_duration(record.duration)
                );
            }
        }
    }
    Ok(())
}
