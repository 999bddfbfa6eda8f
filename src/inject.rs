//! Applies a [`TranslationMapping`] to the switch groups of a document.

use std::collections::{
    BTreeSet,
    HashMap,
};
use std::path::{
    Path,
    PathBuf,
};

use serde::Serialize;

use crate::error::Error;
use crate::extract::{
    locus_key,
    translated_text,
};
use crate::mapping::{
    TranslationMapping,
    Translations,
    load_all_mappings,
};
pub use crate::prepare::generate_unique_id;
use crate::prepare::{
    IdRegistry,
    PrepareOptions,
    default_text,
    make_translation_ready,
    switch_texts,
};
use crate::svg::{
    Document,
    NodeId,
};
use crate::text::split_year_suffix;

/// Where [`inject`] takes its translations from.
#[derive(Debug, Clone, Copy)]
pub enum MappingSource<'a> {
    /// An already loaded mapping.
    Mapping(&'a TranslationMapping),
    /// Mapping files merged with [`load_all_mappings`].
    Files(&'a [PathBuf]),
}

/// Settings for [`inject`] and [`work_on_switches`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectOptions {
    /// Match mapping keys exactly; when false keys are compared lowercased.
    pub case_sensitive: bool,
    /// Replace the text of existing language variants.
    pub overwrite: bool,
    /// Write the result to [`get_target_path`].
    pub save_result: bool,
    /// Exact output path; takes precedence over `output_dir`.
    pub output_file: Option<PathBuf>,
    /// Directory the result is written to under the source file name.
    pub output_dir: Option<PathBuf>,
    /// How the document is brought into translation-ready form first.
    pub prepare: PrepareOptions,
}

impl Default for InjectOptions {
    fn default() -> Self {
        Self {
            case_sensitive: true,
            overwrite: false,
            save_result: false,
            output_file: None,
            output_dir: None,
            prepare: PrepareOptions::default(),
        }
    }
}

/// Counters of one injection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InjectStats {
    /// Switches whose default text matched a mapping key.
    pub processed_switches: usize,
    /// New language variants.
    pub inserted_translations: usize,
    /// Existing variants whose text was replaced.
    pub updated_translations: usize,
    /// Existing variants left unchanged.
    pub skipped_translations: usize,
    /// Distinct languages that got at least one new variant.
    pub new_languages: usize,
}

impl InjectStats {
    /// Returns true if the document was modified.
    #[must_use]
    pub const fn has_changes(&self) -> bool {
        self.inserted_translations + self.updated_translations > 0
    }

    /// Adds the counters of `other`.
    pub const fn add(&mut self, other: &Self) {
        self.processed_switches += other.processed_switches;
        self.inserted_translations += other.inserted_translations;
        self.updated_translations += other.updated_translations;
        self.skipped_translations += other.skipped_translations;
        self.new_languages += other.new_languages;
    }
}

/// Result of [`inject`].
#[derive(Debug, Clone)]
pub struct InjectOutcome {
    /// The prepared document with the translations applied.
    pub document: Document,
    /// What changed.
    pub stats: InjectStats,
    /// Path written when `save_result` was set.
    pub saved_to: Option<PathBuf>,
}

/// Resolves where an injected document is written.
///
/// `output_file` wins and gets its parent directories created; otherwise the
/// file keeps its name inside `output_dir`, which is created; otherwise the
/// source is overwritten.
///
/// # Errors
/// Fails when a directory cannot be created, or when `output_dir` is given and
/// `source` has no file name.
pub fn get_target_path(
    source: impl AsRef<Path>,
    output_file: Option<&Path>,
    output_dir: Option<&Path>,
) -> std::io::Result<PathBuf> {
    let source = source.as_ref();

    if let Some(output_file) = output_file {
        if let Some(parent) = output_file.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        return Ok(output_file.to_path_buf());
    }

    if let Some(output_dir) = output_dir {
        std::fs::create_dir_all(output_dir)?;
        let name = source.file_name().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("'{}' has no file name", source.display()),
            )
        })?;
        return Ok(output_dir.join(name));
    }

    Ok(source.to_path_buf())
}

/// Writes `translation` into the spans of a locus.
///
/// With one line per span, line *i* replaces span *i*. Otherwise the lines are
/// joined with spaces into the first span and the other spans are removed.
pub fn set_translation(doc: &mut Document, text: NodeId, translation: &str) {
    let lines: Vec<&str> = translation.split('\n').collect();
    let spans: Vec<NodeId> =
        doc.child_elements(text).into_iter().filter(|&c| doc.is_element(c, "tspan")).collect();

    if spans.is_empty() {
        doc.set_text(text, lines.join(" "));
        return;
    }

    if lines.len() == spans.len() {
        for (&span, line) in spans.iter().zip(lines) {
            doc.set_text(span, line);
        }
        return;
    }

    if let Some((&first, rest)) = spans.split_first() {
        doc.set_text(first, lines.join(" "));
        for &span in rest {
            doc.detach(span);
        }
    }
}

/// Looks up translations by key, optionally ignoring case.
struct Lookup<'a> {
    /// Exact keys.
    mapping: &'a TranslationMapping,
    /// Lowercased keys, built only for case-insensitive lookups.
    folded: Option<HashMap<String, &'a Translations>>,
}

impl<'a> Lookup<'a> {
    /// Indexes `mapping` for the requested case handling.
    fn new(mapping: &'a TranslationMapping, case_sensitive: bool) -> Self {
        let folded = (!case_sensitive)
            .then(|| mapping.iter().map(|(key, value)| (key.to_lowercase(), value)).collect());
        Self { mapping, folded }
    }

    /// Exact match first, then the lowercased index.
    fn get(&self, key: &str) -> Option<&'a Translations> {
        self.mapping
            .get(key)
            .or_else(|| self.folded.as_ref().and_then(|folded| folded.get(key).copied()))
    }

    /// Translations for `key`, falling back to the year-less key with the year
    /// appended back to every translation.
    fn resolve(&self, key: &str) -> Option<Translations> {
        if let Some(translations) = self.get(key) {
            return Some(translations.clone());
        }
        let (stem, year) = split_year_suffix(key)?;
        let translations = self.get(stem)?;
        tracing::debug!(key, stem, "Using year-less translations");
        Some(
            translations
                .iter()
                .map(|(lang, text)| (lang.clone(), format!("{} {year}", text.trim_end())))
                .collect(),
        )
    }
}

/// Inserts or updates language variants in every switch of a prepared document.
pub fn work_on_switches(
    doc: &mut Document,
    mapping: &TranslationMapping,
    options: &InjectOptions,
) -> InjectStats {
    let lookup = Lookup::new(mapping, options.case_sensitive);
    let mut ids = IdRegistry::from_document(doc);
    let mut stats = InjectStats::default();
    let mut new_languages = BTreeSet::new();

    for switch in doc.elements_by_name("switch") {
        let Some(default) = default_text(doc, switch) else {
            continue;
        };
        let key = locus_key(doc, default, options.case_sensitive);
        if key.is_empty() {
            continue;
        }
        let Some(translations) = lookup.resolve(&key) else {
            tracing::debug!(key = %key, "No translations for switch");
            continue;
        };
        stats.processed_switches += 1;

        let existing: HashMap<String, NodeId> = switch_texts(doc, switch)
            .into_iter()
            .filter_map(|t| doc.attribute(t, "systemLanguage").map(|lang| (lang.to_string(), t)))
            .collect();

        for (lang, translation) in &translations {
            if let Some(&variant) = existing.get(lang) {
                if options.overwrite && translated_text(doc, variant) != *translation {
                    set_translation(doc, variant, translation);
                    stats.updated_translations += 1;
                } else {
                    stats.skipped_translations += 1;
                }
                continue;
            }

            let base_id = doc.attribute(default, "id").map(str::to_string);
            let base_id = base_id.unwrap_or_else(|| {
                let id = ids.generate();
                doc.set_attribute(default, "id", id.as_str());
                id
            });
            let variant = doc.deep_clone(default);
            doc.set_attribute(variant, "systemLanguage", lang.as_str());
            let id = ids.derive(&base_id, lang);
            doc.set_attribute(variant, "id", id);
            ids.derive_span_ids(doc, variant, lang);
            set_translation(doc, variant, translation);
            doc.insert_before(default, variant);

            stats.inserted_translations += 1;
            new_languages.insert(lang.clone());
        }
    }

    stats.new_languages = new_languages.len();
    tracing::debug!(?stats, "Injected translations");
    stats
}

/// Loads and prepares `source`, injects the translations and optionally saves
/// the result.
///
/// # Errors
/// - [`Error::EmptyMapping`] when there is nothing to inject
/// - [`Error::Mapping`] when a mapping file cannot be loaded
/// - [`Error::Io`], [`Error::Xml`], [`Error::Prepare`] for the document itself
pub fn inject(
    source: impl AsRef<Path>,
    mapping: MappingSource<'_>,
    options: &InjectOptions,
) -> Result<InjectOutcome, Error> {
    let source = source.as_ref();

    let loaded;
    let mapping = match mapping {
        MappingSource::Mapping(mapping) => mapping,
        MappingSource::Files(paths) => {
            loaded = load_all_mappings(paths)?;
            &loaded
        }
    };
    if mapping.is_empty() {
        return Err(Error::EmptyMapping);
    }

    let mut document = Document::load(source)?;
    make_translation_ready(&mut document, &options.prepare)?;
    let stats = work_on_switches(&mut document, mapping, options);

    let saved_to = if options.save_result {
        let target =
            get_target_path(source, options.output_file.as_deref(), options.output_dir.as_deref())
                .map_err(|source| Error::Io { path: requested_output(options), source })?;
        document.save(&target)?;
        tracing::debug!(target = %target.display(), "Saved injected document");
        Some(target)
    } else {
        None
    };

    Ok(InjectOutcome { document, stats, saved_to })
}

/// Output path named in `options`, for error messages.
fn requested_output(options: &InjectOptions) -> PathBuf {
    options.output_file.clone().or_else(|| options.output_dir.clone()).unwrap_or_default()
}
