//! Settings file (`.svg-translate.json`) loading and validation.

/// Config file loader
mod loader;
/// Configuration manager
mod manager;
/// Configuration types and settings
mod types;

pub use loader::{
    CONFIG_FILE_NAME,
    load_from_dir,
    load_from_path,
};
pub use manager::ConfigManager;
pub use types::{
    ConfigError,
    Settings,
    ValidationError,
};
