//! Holds the active settings.

use std::path::{
    Path,
    PathBuf,
};

use super::{
    ConfigError,
    Settings,
    loader,
};

/// Loads, validates and keeps the settings in effect.
#[derive(Default, Debug, Clone)]
pub struct ConfigManager {
    /// Validated settings in effect.
    current_settings: Settings,

    /// File the settings came from, if any.
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Starts with the default settings.
    #[must_use]
    pub fn new() -> Self {
        Self { current_settings: Settings::default(), config_path: None }
    }

    /// Loads settings from an explicit file, or from `.svg-translate.json` in
    /// `search_dir`; defaults are used when neither exists.
    ///
    /// # Errors
    /// - An explicit `config_file` that does not exist
    /// - File read error
    /// - JSON parse error
    /// - Validation errors
    pub fn load_settings(
        &mut self,
        config_file: Option<&Path>,
        search_dir: &Path,
    ) -> Result<(), ConfigError> {
        let (settings, config_path) = match config_file {
            Some(path) => {
                let settings = loader::load_from_path(path)?.ok_or_else(|| {
                    std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        format!("{} does not exist", path.display()),
                    )
                })?;
                (settings, Some(path.to_path_buf()))
            }
            None => match loader::load_from_dir(search_dir)? {
                Some(settings) => (settings, Some(search_dir.join(loader::CONFIG_FILE_NAME))),
                None => (Settings::default(), None),
            },
        };

        settings.validate().map_err(ConfigError::ValidationErrors)?;

        self.current_settings = settings;
        self.config_path = config_path;
        tracing::debug!("Settings loaded successfully: {:?}", self.current_settings);

        Ok(())
    }

    /// Replaces the settings, e.g. after applying command line overrides.
    ///
    /// # Errors
    /// Validation errors; the previous settings are kept.
    pub fn update_settings(&mut self, new_settings: Settings) -> Result<(), ConfigError> {
        new_settings.validate().map_err(ConfigError::ValidationErrors)?;
        self.current_settings = new_settings;
        tracing::debug!("Settings updated successfully");
        Ok(())
    }

    /// The settings in effect.
    #[must_use]
    pub const fn get_settings(&self) -> &Settings {
        &self.current_settings
    }

    /// File the settings were read from; `None` for defaults.
    #[must_use]
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::fs;

    use rstest::rstest;
    use tempfile::TempDir;

    use super::*;

    #[rstest]
    fn test_new_creates_default_settings() {
        let manager = ConfigManager::new();

        assert!(manager.get_settings().case_sensitive);
        assert!(manager.config_path().is_none());
    }

    #[rstest]
    fn test_load_settings_without_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let mut manager = ConfigManager::new();

        manager.load_settings(None, temp_dir.path()).unwrap();

        assert_eq!(manager.get_settings(), &Settings::default());
        assert!(manager.config_path().is_none());
    }

    #[rstest]
    fn test_load_settings_from_dir() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(loader::CONFIG_FILE_NAME), r#"{"overwrite": true}"#)
            .unwrap();
        let mut manager = ConfigManager::new();

        manager.load_settings(None, temp_dir.path()).unwrap();

        assert!(manager.get_settings().overwrite);
        assert_eq!(
            manager.config_path(),
            Some(temp_dir.path().join(loader::CONFIG_FILE_NAME).as_path())
        );
    }

    #[rstest]
    fn test_load_settings_missing_explicit_file() {
        let temp_dir = TempDir::new().unwrap();
        let mut manager = ConfigManager::new();

        let missing = temp_dir.path().join("nope.json");

        let result = manager.load_settings(Some(missing.as_path()), temp_dir.path());

        assert!(matches!(result, Err(ConfigError::IoError(_))));
    }

    #[rstest]
    fn test_load_settings_validation_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        fs::write(&path, r#"{"includePatterns": []}"#).unwrap();
        let mut manager = ConfigManager::new();

        let result = manager.load_settings(Some(path.as_path()), temp_dir.path());

        assert!(matches!(result, Err(ConfigError::ValidationErrors(_))));
        assert_eq!(manager.get_settings(), &Settings::default());
    }

    #[rstest]
    fn test_update_settings_keeps_old_on_error() {
        let mut manager = ConfigManager::new();
        let invalid = Settings { num_threads: Some(0), ..Settings::default() };

        assert!(manager.update_settings(invalid).is_err());
        assert_eq!(manager.get_settings().num_threads, None);
    }
}
