use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use crate::state::Settings;

const APP_DIR: &str = "TamilThulir";
const STORE_FILE: &str = "settings.json";

/// `<config dir>/TamilThulir/settings.json`
pub fn settings_path() -> Result<PathBuf> {
    let config = dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("Cannot find the user config directory"))?;
    Ok(config.join(APP_DIR).join(STORE_FILE))
}

/// Never fails: anything unreadable falls back to defaults
pub fn load_settings(path: &Path) -> Settings {
    let data = match std::fs::read_to_string(path) {
        Ok(d) => d,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!("No stored settings found. Using defaults.");
            return Settings::default();
        }
        Err(e) => {
            tracing::warn!("Failed to open settings store {}: {}. Using defaults.", path.display(), e);
            return Settings::default();
        }
    };

    match serde_json::from_str::<Settings>(&data) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!("Failed to deserialize stored settings: {}. Using defaults.", e);
            Settings::default()
        }
    }
}

pub fn save_settings(path: &Path, settings: &Settings) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let data = serde_json::to_string_pretty(settings).context("Failed to serialize settings")?;
    std::fs::write(path, data)
        .with_context(|| format!("Failed to save settings to {}", path.display()))?;
    tracing::info!("Settings saved to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(STORE_FILE);

        let mut settings = Settings::default();
        settings.tts.voice = "Kore".to_string();
        settings.quiz.seed = Some(99);
        save_settings(&path, &settings).unwrap();

        assert_eq!(load_settings(&path), settings);
    }

    #[test]
    fn missing_or_corrupt_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(STORE_FILE);
        assert_eq!(load_settings(&path), Settings::default());

        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(load_settings(&path), Settings::default());
    }
}
