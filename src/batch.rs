//! Injects one mapping into many files, recording an outcome per file.
//!
//! A failing file never stops the batch: its error is classified, counted and
//! stored next to the results of the other files.

use std::collections::BTreeMap;
use std::path::{
    Path,
    PathBuf,
};

use serde::Serialize;

use crate::error::Error;
use crate::inject::{
    InjectOptions,
    InjectStats,
    MappingSource,
    get_target_path,
    inject,
};
use crate::mapping::TranslationMapping;
use crate::prepare::{
    PrepareError,
    StructureIssue,
};

/// Default worker count: 80% of the CPU cores, at least one.
#[must_use]
pub fn default_threads() -> usize {
    (num_cpus::get() * 4 / 5).max(1)
}

/// Settings for [`start_injects`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOptions {
    /// Per-file injection settings; `save_result` and `output_file` are
    /// managed by the batch.
    pub inject: InjectOptions,
    /// Directory for the written files; `None` overwrites the inputs.
    pub output_dir: Option<PathBuf>,
    /// Worker threads; 1 processes files on the calling thread.
    pub threads: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self { inject: InjectOptions::default(), output_dir: None, threads: 1 }
    }
}

/// Class of a per-file failure, used as the key of [`BatchReport::errors`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    /// The file could not be read or written.
    Io,
    /// Malformed markup.
    Xml,
    /// Nested `tspan` elements.
    NestedSpans,
    /// Any other unsupported structure.
    Structure,
    /// Two texts of one switch share a language.
    DuplicateLanguage,
    /// A `text` or `tspan` id is unusable.
    InvalidId,
    /// A `systemLanguage` value is empty.
    InvalidLanguage,
    /// A mapping file failed to load.
    Mapping,
    /// Nothing to inject.
    EmptyMapping,
}

impl FailureKind {
    /// Classifies a crate error.
    #[must_use]
    pub fn of(error: &Error) -> Self {
        match error {
            Error::Io { .. } => Self::Io,
            Error::Xml(_) => Self::Xml,
            Error::Prepare(PrepareError::Structure(e))
                if matches!(e.issue, StructureIssue::NestedTspans) =>
            {
                Self::NestedSpans
            }
            Error::Prepare(PrepareError::Structure(_)) => Self::Structure,
            Error::Prepare(PrepareError::DuplicateLanguage { .. }) => Self::DuplicateLanguage,
            Error::Prepare(PrepareError::InvalidId { .. }) => Self::InvalidId,
            Error::Prepare(PrepareError::InvalidLanguage(_)) => Self::InvalidLanguage,
            Error::Mapping(_) => Self::Mapping,
            Error::EmptyMapping => Self::EmptyMapping,
        }
    }
}

/// What happened to one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum FileStatus {
    /// Translations were added or updated and the result was written.
    Saved {
        /// Where the result was written.
        output: PathBuf,
    },
    /// Nothing to add; the file was not written.
    NoChanges,
    /// The file was skipped.
    Failed {
        /// Class of the error.
        kind: FailureKind,
        /// The error message.
        message: String,
    },
}

/// Outcome of one input file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileResult {
    /// The input file.
    pub path: PathBuf,
    /// What happened to it.
    #[serde(flatten)]
    pub status: FileStatus,
    /// Injection counters; zero for failed files.
    pub stats: InjectStats,
}

/// Totals and per-file results of a batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// Number of input files.
    pub files: usize,
    /// Files written with changes.
    pub saved_done: usize,
    /// Files left alone because nothing changed.
    pub no_changes: usize,
    /// Files that failed and were not written.
    pub no_save: usize,
    /// Files rejected for nested `tspan` elements.
    pub nested_files: usize,
    /// Failed files per failure class.
    pub errors: BTreeMap<FailureKind, usize>,
    /// Counters summed over all files.
    pub stats: InjectStats,
    /// One entry per input, in input order.
    pub results: Vec<FileResult>,
}

impl BatchReport {
    /// Sums up per-file results.
    fn from_results(results: Vec<FileResult>) -> Self {
        let mut report = Self { files: results.len(), ..Self::default() };
        for result in &results {
            report.stats.add(&result.stats);
            match &result.status {
                FileStatus::Saved { .. } => report.saved_done += 1,
                FileStatus::NoChanges => report.no_changes += 1,
                FileStatus::Failed { kind, .. } => {
                    report.no_save += 1;
                    if *kind == FailureKind::NestedSpans {
                        report.nested_files += 1;
                    }
                    *report.errors.entry(*kind).or_default() += 1;
                }
            }
        }
        report.results = results;
        report
    }

    /// Writes the report as pretty JSON, creating parent directories.
    ///
    /// # Errors
    /// Returns [`Error::Io`] when the file cannot be written.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let path = path.as_ref();
        let io_error = |source: std::io::Error| Error::Io { path: path.to_path_buf(), source };

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| io_error(e.into()))?;
        std::fs::write(path, json).map_err(io_error)
    }
}

/// Injects into one file and writes it when something changed.
fn process_file(path: &Path, mapping: &TranslationMapping, options: &BatchOptions) -> FileResult {
    let inject_options =
        InjectOptions { save_result: false, output_file: None, output_dir: None, ..options.inject.clone() };

    let outcome = inject(path, MappingSource::Mapping(mapping), &inject_options).and_then(|outcome| {
        if !outcome.stats.has_changes() {
            return Ok((FileStatus::NoChanges, outcome.stats));
        }
        let target = get_target_path(path, None, options.output_dir.as_deref())
            .map_err(|source| Error::Io { path: path.to_path_buf(), source })?;
        outcome.document.save(&target)?;
        Ok((FileStatus::Saved { output: target }, outcome.stats))
    });

    let (status, stats) = match outcome {
        Ok(done) => done,
        Err(e) => {
            let kind = FailureKind::of(&e);
            tracing::warn!(path = %path.display(), ?kind, "{e}");
            (FileStatus::Failed { kind, message: e.to_string() }, InjectStats::default())
        }
    };
    tracing::debug!(path = %path.display(), ?status, "Processed file");
    FileResult { path: path.to_path_buf(), status, stats }
}

/// Injects `mapping` into every file, saving changed files into
/// `options.output_dir` (or in place when unset).
///
/// Results keep the order of `files`.
#[must_use]
pub fn start_injects<P: AsRef<Path> + Sync>(
    files: &[P],
    mapping: &TranslationMapping,
    options: &BatchOptions,
) -> BatchReport {
    let threads = options.threads.clamp(1, files.len().max(1));
    tracing::info!(files = files.len(), threads, "Starting batch injection");

    let results: Vec<FileResult> = if threads == 1 {
        files.iter().map(|path| process_file(path.as_ref(), mapping, options)).collect()
    } else {
        let chunk_size = files.len().div_ceil(threads);
        std::thread::scope(|scope| {
            let workers: Vec<_> = files
                .chunks(chunk_size)
                .map(|chunk| {
                    scope.spawn(move || {
                        chunk
                            .iter()
                            .map(|path| process_file(path.as_ref(), mapping, options))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();

            workers
                .into_iter()
                .zip(files.chunks(chunk_size))
                .flat_map(|(worker, chunk)| {
                    worker.join().unwrap_or_else(|_| {
                        chunk
                            .iter()
                            .map(|path| FileResult {
                                path: path.as_ref().to_path_buf(),
                                status: FileStatus::Failed {
                                    kind: FailureKind::Io,
                                    message: "worker thread panicked".to_string(),
                                },
                                stats: InjectStats::default(),
                            })
                            .collect()
                    })
                })
                .collect()
        })
    };

    let report = BatchReport::from_results(results);
    tracing::info!(
        saved = report.saved_done,
        no_changes = report.no_changes,
        failed = report.no_save,
        "Batch injection finished"
    );
    report
}
