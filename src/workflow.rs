//! Extract from one SVG, inject into others.

use std::path::{
    Path,
    PathBuf,
};

use crate::batch::{
    BatchOptions,
    BatchReport,
    start_injects,
};
use crate::error::Error;
use crate::extract::{
    ExtractOptions,
    extract_file,
};
use crate::inject::{
    InjectOptions,
    InjectOutcome,
    MappingSource,
    inject,
};
use crate::mapping::{
    TranslationMapping,
    save_mapping,
};

/// Settings for the extract-then-inject workflows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkflowOptions {
    /// How the source is read.
    pub extract: ExtractOptions,
    /// Also save the extracted mapping here.
    pub mapping_output: Option<PathBuf>,
}

/// Extracts `source`, failing on an empty result, and saves the mapping if asked.
fn extract_for_workflow(
    source: &Path,
    options: &WorkflowOptions,
) -> Result<TranslationMapping, Error> {
    let mapping = extract_file(source, &options.extract)?;
    if mapping.is_empty() {
        return Err(Error::EmptyMapping);
    }
    if let Some(output) = &options.mapping_output {
        save_mapping(output, &mapping)?;
    }
    tracing::info!(source = %source.display(), keys = mapping.len(), "Extracted translations");
    Ok(mapping)
}

/// Extracts the translations of `source` and injects them into `target`.
///
/// # Errors
/// Returns [`Error::EmptyMapping`] when `source` has no translations, or the
/// error of the failing extraction or injection step.
pub fn svg_extract_and_inject(
    source: impl AsRef<Path>,
    target: impl AsRef<Path>,
    options: &WorkflowOptions,
    inject_options: &InjectOptions,
) -> Result<InjectOutcome, Error> {
    let mapping = extract_for_workflow(source.as_ref(), options)?;
    inject(target, MappingSource::Mapping(&mapping), inject_options)
}

/// Extracts the translations of `source` and injects them into every target.
///
/// # Errors
/// Only extraction errors are returned; per-target failures are in the report.
pub fn svg_extract_and_injects<P: AsRef<Path> + Sync>(
    source: impl AsRef<Path>,
    targets: &[P],
    options: &WorkflowOptions,
    batch_options: &BatchOptions,
) -> Result<BatchReport, Error> {
    let mapping = extract_for_workflow(source.as_ref(), options)?;
    Ok(start_injects(targets, &mapping, batch_options))
}
