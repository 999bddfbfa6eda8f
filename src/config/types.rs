use std::path::PathBuf;

use serde::{
    Deserialize,
    Serialize,
};
use thiserror::Error;

use crate::batch::default_threads;
use crate::inject::InjectOptions;
use crate::prepare::{
    GroupingPolicy,
    PrepareOptions,
};

/// A problem with one settings field.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Configuration error in '{field_path}': {message}")]
pub struct ValidationError {
    /// JSON path to the field (e.g., "includePatterns[0]")
    pub field_path: String,
    /// What is wrong and how to fix it.
    pub message: String,
}

impl ValidationError {
    /// Creates an error for the field at `field_path`.
    #[must_use]
    pub fn new(field_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field_path: field_path.into(), message: message.into() }
    }
}

/// Why settings could not be loaded or applied.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// One or more fields failed validation.
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    ValidationErrors(Vec<ValidationError>),

    /// The settings file could not be read.
    #[error("Failed to load configuration file: {0}")]
    IoError(#[from] std::io::Error),

    /// The settings file is not valid JSON for [`Settings`].
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// One numbered line per error.
fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .enumerate()
        .map(|(i, err)| format!("  {}. {} - {}", i + 1, err.field_path, err.message))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Contents of `.svg-translate.json`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Match translation keys with their case.
    pub case_sensitive: bool,
    /// Replace existing language variants on injection.
    pub overwrite: bool,
    /// How loose texts are grouped into switches.
    pub grouping: GroupingPolicy,

    /// Globs selecting SVG files when a directory is given.
    pub include_patterns: Vec<String>,
    /// Globs removing files from the included set.
    pub exclude_patterns: Vec<String>,

    /// Mapping files merged in order; later files win.
    pub mapping_files: Vec<PathBuf>,
    /// Where injected files are written; unset overwrites them.
    pub output_dir: Option<PathBuf>,

    /// Worker threads for batch injection.
    /// Default: 80% of CPU cores (minimum 1).
    pub num_threads: Option<usize>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            case_sensitive: true,
            overwrite: false,
            grouping: GroupingPolicy::default(),
            include_patterns: vec!["**/*.svg".to_string()],
            exclude_patterns: Vec::new(),
            mapping_files: Vec::new(),
            output_dir: None,
            num_threads: None,
        }
    }
}

impl Settings {
    /// Checks every field and collects all problems.
    ///
    /// # Errors
    /// - Empty include list
    /// - Invalid glob pattern
    /// - Zero threads
    /// - Empty mapping file path
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.include_patterns.is_empty() {
            errors.push(ValidationError::new(
                "includePatterns",
                "At least one pattern is required. Example: [\"**/*.svg\"]",
            ));
        }

        for (index, pattern) in self.include_patterns.iter().enumerate() {
            if let Err(e) = globset::Glob::new(pattern) {
                errors.push(ValidationError::new(
                    format!("includePatterns[{index}]"),
                    format!("Invalid glob pattern '{pattern}': {e}"),
                ));
            }
        }

        for (index, pattern) in self.exclude_patterns.iter().enumerate() {
            if let Err(e) = globset::Glob::new(pattern) {
                errors.push(ValidationError::new(
                    format!("excludePatterns[{index}]"),
                    format!("Invalid glob pattern '{pattern}': {e}"),
                ));
            }
        }

        for (index, path) in self.mapping_files.iter().enumerate() {
            if path.as_os_str().is_empty() {
                errors.push(ValidationError::new(
                    format!("mappingFiles[{index}]"),
                    "The path cannot be empty",
                ));
            }
        }

        if self.num_threads == Some(0) {
            errors.push(ValidationError::new(
                "numThreads",
                "At least one thread is required. Remove this field to use the default",
            ));
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    /// Worker thread count, falling back to the CPU-based default.
    #[must_use]
    pub fn threads(&self) -> usize {
        self.num_threads.unwrap_or_else(default_threads)
    }

    /// Preparation options derived from these settings.
    #[must_use]
    pub const fn prepare_options(&self) -> PrepareOptions {
        PrepareOptions { grouping: self.grouping }
    }

    /// Injection options derived from these settings; nothing is saved.
    #[must_use]
    pub fn inject_options(&self) -> InjectOptions {
        InjectOptions {
            case_sensitive: self.case_sensitive,
            overwrite: self.overwrite,
            output_dir: self.output_dir.clone(),
            prepare: self.prepare_options(),
            ..InjectOptions::default()
        }
    }
}
