use clap::Subcommand;
use tempo_core::Config;

use super::{open_app, CliResult};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a config value
    Get {
        /// Config key (e.g. "timer.work_duration", "timer.sound_enabled")
        key: String,
    },
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// New value
        value: String,
    },
    /// List all config values
    List,
    /// Reset config to defaults
    Reset,
}

pub fn run(action: ConfigAction) -> CliResult {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            match config.get(&key) {
                Some(value) => println!("{value}"),
                None => return Err(format!("unknown key: {key}").into()),
            }
        }
        ConfigAction::Set { key, value } => {
            let previous = Config::load()?;
            let mut config = previous.clone();
            config.set(&key, &value)?;
            config.save()?;
            apply(&previous, &config)?;
            println!("ok");
        }
        ConfigAction::List => {
            let config = Config::load()?;
            println!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigAction::Reset => {
            let previous = Config::load_or_default();
            let config = Config::default();
            config.save()?;
            apply(&previous, &config)?;
            println!("config reset to defaults");
        }
    }
    Ok(())
}

/// Push new durations into the persisted timer. The timer state does not
/// record which durations it was built from, so it is loaded under the
/// previous config and then handed the new one.
fn apply(previous: &Config, config: &Config) -> CliResult {
    let mut app = open_app(previous)?;
    app.apply_settings(config);
    Ok(())
}
