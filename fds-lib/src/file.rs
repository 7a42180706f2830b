//! Backup documents.
//!
//! A backup is the [`Settings`] model as pretty-printed JSON with the same
//! camelCase keys the model serializes with. Loaded documents are validated
//! before they are handed out.

use crate::error::FdsError;
use crate::settings::Settings;
use std::fs;
use std::path::Path;
use tracing::info;

pub fn export_settings(settings: &Settings) -> Result<String, FdsError> {
    Ok(serde_json::to_string_pretty(settings)?)
}

pub fn import_settings(document: &str) -> Result<Settings, FdsError> {
    let settings: Settings = serde_json::from_str(document)?;
    settings.validate()?;
    Ok(settings)
}

pub fn save(path: impl AsRef<Path>, settings: &Settings) -> Result<(), FdsError> {
    let path = path.as_ref();
    fs::write(path, export_settings(settings)?)?;
    info!(path = %path.display(), "Settings saved");
    Ok(())
}

pub fn load(path: impl AsRef<Path>) -> Result<Settings, FdsError> {
    let path = path.as_ref();
    let settings = import_settings(&fs::read_to_string(path)?)?;
    info!(path = %path.display(), "Settings loaded");
    Ok(settings)
}
