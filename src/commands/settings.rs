use std::path::Path;
use anyhow::{bail, Context, Result};
use clap::Subcommand;
use serde_json::Value;

use crate::persistence;
use crate::state::Settings;

#[derive(Debug, Clone, Subcommand)]
pub enum SettingsAction {
    /// Print the current settings
    Show,
    /// Change one value, e.g. `tts.voice Kore` or `quiz.seed 7`
    Set { key: String, value: String },
    /// Print where settings are stored
    Path,
}

pub fn handle(path: &Path, settings: Settings, action: Option<SettingsAction>) -> Result<()> {
    match action.unwrap_or(SettingsAction::Show) {
        SettingsAction::Show => {
            let data = serde_json::to_string_pretty(&settings)?;
            println!("{}", data);
        }
        SettingsAction::Path => println!("{}", path.display()),
        SettingsAction::Set { key, value } => {
            let updated = apply(settings, &key, &value)?;
            persistence::save_settings(path, &updated)?;
            println!("{} updated", key);
        }
    }
    Ok(())
}

/// Set a dotted key on a copy of `settings`.
///
/// The value is read as JSON first so numbers, booleans and `null` keep
/// their type; anything else is taken as a plain string.
pub fn apply(settings: Settings, key: &str, value: &str) -> Result<Settings> {
    let mut tree = serde_json::to_value(&settings)?;
    let pointer = format!("/{}", key.trim().replace('.', "/"));

    let slot = match tree.pointer_mut(&pointer) {
        Some(slot) if !slot.is_object() => slot,
        _ => bail!("Unknown setting '{}'", key),
    };
    *slot = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));

    serde_json::from_value(tree).with_context(|| format!("Invalid value '{}' for {}", value, key))
}
