use std::{fs, path::Path};

use anyhow::Result;
use log::warn;

use crate::models::Settings;

/// Loads settings from `path`.
///
/// A missing or unparsable file yields [`Settings::default`] so a fresh
/// install can start without configuration.
pub fn load_settings(path: impl AsRef<Path>) -> Settings {
    let path = path.as_ref();
    match fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(settings) => settings,
            Err(err) => {
                warn!(target: "config", "ignoring unparsable {}: {err}", path.display());
                Settings::default()
            }
        },
        Err(_) => Settings::default(),
    }
}

/// Saves `settings` to `path` as pretty-printed JSON.
pub fn save_settings(path: impl AsRef<Path>, settings: &Settings) -> Result<()> {
    fs::write(path, serde_json::to_string_pretty(settings)?)?;
    Ok(())
}
