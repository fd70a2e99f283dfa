use clap::Subcommand;
use tempo_core::Config;

use super::{open_app, print_json, save_tags, CliResult};

#[derive(Subcommand)]
pub enum TagAction {
    /// List tags, marking the active one
    List,
    /// Add a tag
    Add { name: String },
    /// Rename a tag everywhere, including recorded sessions
    Rename { old: String, new: String },
    /// Remove a tag from the list (recorded sessions keep it)
    Remove { name: String },
    /// Make a tag the active one
    Select { name: String },
}

pub fn run(action: TagAction) -> CliResult {
    let mut config = Config::load()?;
    let mut app = open_app(&config)?;

    match action {
        TagAction::List => {
            for tag in app.tags().as_slice() {
                let marker = if tag == app.tag() { "*" } else { " " };
                println!("{marker} {tag}");
            }
            return Ok(());
        }
        TagAction::Add { name } => {
            app.add_tag(&name)?;
            save_tags(&mut config, &app)?;
        }
        TagAction::Rename { old, new } => {
            let outcome = app.rename_tag(&old, &new)?;
            save_tags(&mut config, &app)?;
            eprintln!("renamed {} recorded session(s)", outcome.renamed);
        }
        TagAction::Remove { name } => {
            app.remove_tag(&name)?;
            save_tags(&mut config, &app)?;
        }
        TagAction::Select { name } => app.select_tag(&name)?,
    }

    print_json(&serde_json::json!({
        "active": app.tag(),
        "tags": app.tags(),
    }))
}
