//! SVG file discovery under a directory.

use std::path::{
    Path,
    PathBuf,
};

use globset::{
    Glob,
    GlobSet,
    GlobSetBuilder,
};
use ignore::WalkBuilder;

/// Why input paths could not be expanded.
#[derive(Debug, thiserror::Error)]
pub enum DiscoverError {
    /// An include glob does not compile.
    #[error("Invalid include pattern '{pattern}': {source}")]
    InvalidIncludePattern {
        /// The pattern as configured.
        pattern: String,
        /// Glob compile error.
        #[source]
        source: globset::Error,
    },

    /// An exclude glob does not compile.
    #[error("Invalid exclude pattern '{pattern}': {source}")]
    InvalidExcludePattern {
        /// The pattern as configured.
        pattern: String,
        /// Glob compile error.
        #[source]
        source: globset::Error,
    },

    /// The compiled globs could not be combined.
    #[error("Failed to build glob set: {0}")]
    GlobSetBuild(#[from] globset::Error),

    /// The root is neither a file nor a directory.
    #[error("'{}' does not exist", .0.display())]
    NotFound(PathBuf),
}

/// Include/exclude glob patterns matched against paths relative to a root.
#[derive(Debug, Clone)]
pub struct SvgMatcher {
    /// Paths must match one of these.
    include_set: GlobSet,
    /// Paths must match none of these.
    exclude_set: GlobSet,
}

impl SvgMatcher {
    /// Compiles both pattern lists.
    ///
    /// # Errors
    /// Returns [`DiscoverError`] naming the first invalid pattern.
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self, DiscoverError> {
        let include_set = Self::build_glob_set(include, |pattern, source| {
            DiscoverError::InvalidIncludePattern { pattern, source }
        })?;
        let exclude_set = Self::build_glob_set(exclude, |pattern, source| {
            DiscoverError::InvalidExcludePattern { pattern, source }
        })?;
        Ok(Self { include_set, exclude_set })
    }

    /// Compiles `patterns`, naming the first bad one through `make_error`.
    fn build_glob_set<F>(patterns: &[String], make_error: F) -> Result<GlobSet, DiscoverError>
    where
        F: Fn(String, globset::Error) -> DiscoverError,
    {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = Glob::new(pattern).map_err(|e| make_error(pattern.clone(), e))?;
            builder.add(glob);
        }
        Ok(builder.build()?)
    }

    /// Returns true if `relative_path` is included and not excluded.
    #[must_use]
    pub fn is_match(&self, relative_path: &Path) -> bool {
        self.include_set.is_match(relative_path) && !self.exclude_set.is_match(relative_path)
    }
}

/// Lists the files under `root` accepted by the patterns, sorted.
///
/// `.gitignore` files are honored. A `root` that is a file is returned as is.
///
/// # Errors
/// Returns [`DiscoverError`] for invalid patterns or a missing `root`.
pub fn find_svg_files(
    root: impl AsRef<Path>,
    include: &[String],
    exclude: &[String],
) -> Result<Vec<PathBuf>, DiscoverError> {
    let root = root.as_ref();
    if root.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }
    if !root.is_dir() {
        return Err(DiscoverError::NotFound(root.to_path_buf()));
    }

    let matcher = SvgMatcher::new(include, exclude)?;
    let mut found_files = Vec::new();

    for result in WalkBuilder::new(root)
        .hidden(false)
        .git_ignore(true)
        .git_global(true)
        .git_exclude(true)
        .follow_links(false)
        .build()
    {
        let entry = match result {
            Ok(entry) => entry,
            Err(err) => {
                tracing::debug!(?err, "Failed to read directory entry");
                continue;
            }
        };

        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }

        let path = entry.path();
        let Ok(relative_path) = path.strip_prefix(root) else {
            continue;
        };
        if matcher.is_match(relative_path) {
            found_files.push(path.to_path_buf());
        }
    }

    found_files.sort();
    tracing::debug!(root = %root.display(), count = found_files.len(), "Found SVG files");
    Ok(found_files)
}

/// Expands every input path with [`find_svg_files`], keeping input order.
///
/// A path that does not exist is passed through unchanged, so the batch
/// driver reports it as a failed file instead of aborting the run.
///
/// # Errors
/// Fails on invalid patterns.
pub fn expand_inputs<P: AsRef<Path>>(
    inputs: &[P],
    include: &[String],
    exclude: &[String],
) -> Result<Vec<PathBuf>, DiscoverError> {
    let mut files = Vec::new();
    for input in inputs {
        match find_svg_files(input, include, exclude) {
            Ok(found) => files.extend(found),
            Err(DiscoverError::NotFound(path)) => {
                tracing::warn!("'{}' does not exist", path.display());
                files.push(path);
            }
            Err(e) => return Err(e),
        }
    }
    Ok(files)
}
