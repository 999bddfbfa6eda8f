//! Config file loading.

use std::path::Path;

use super::{
    ConfigError,
    Settings,
};

/// Name of the settings file looked up in a directory.
pub const CONFIG_FILE_NAME: &str = ".svg-translate.json";

/// Loads settings from `config_path`.
///
/// # Returns
/// - `Ok(Some(settings))`: the file exists and parsed
/// - `Ok(None)`: the file does not exist
///
/// # Errors
/// - File read error
/// - JSON parse error
pub fn load_from_path(config_path: &Path) -> Result<Option<Settings>, ConfigError> {
    if !config_path.exists() {
        tracing::debug!("Configuration file not found: {:?}", config_path);
        return Ok(None);
    }

    tracing::debug!("Loading configuration from: {:?}", config_path);

    let content = std::fs::read_to_string(config_path)?;
    let settings: Settings = serde_json::from_str(&content)?;

    Ok(Some(settings))
}

/// Loads `.svg-translate.json` from `dir`.
///
/// # Errors
/// Same as [`load_from_path`].
pub fn load_from_dir(dir: &Path) -> Result<Option<Settings>, ConfigError> {
    load_from_path(&dir.join(CONFIG_FILE_NAME))
}
