//! Crate-level error type for operations that touch the filesystem.

use std::path::PathBuf;

use thiserror::Error;

use crate::mapping::MappingLoadError;
use crate::prepare::PrepareError;
use crate::svg::XmlError;

/// Errors returned by the document, mapping and workflow operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Reading or writing a file or directory failed.
    #[error("Failed to access '{}': {source}", .path.display())]
    Io {
        /// The file or directory that could not be accessed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The SVG markup could not be parsed or written.
    #[error(transparent)]
    Xml(#[from] XmlError),

    /// The document cannot be brought into translation-ready form.
    #[error(transparent)]
    Prepare(#[from] PrepareError),

    /// A mapping file could not be loaded.
    #[error(transparent)]
    Mapping(#[from] MappingLoadError),

    /// The mapping to inject, or the one extracted from a source, has no entries.
    #[error("No translations to inject")]
    EmptyMapping,
}
