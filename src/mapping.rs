//! Translation memory: loading, merging and saving JSON mapping files.

use std::collections::{
    BTreeMap,
    BTreeSet,
    btree_map,
};
use std::path::{
    Path,
    PathBuf,
};

use serde::{
    Deserialize,
    Serialize,
};
use serde_json::{
    Map,
    Value,
};
use thiserror::Error;

use crate::error::Error;
use crate::text::{
    normalize_lang,
    normalize_text,
};

/// Language code to translated text.
pub type Translations = BTreeMap<String, String>;

/// Translation key to per-language texts.
///
/// Inner maps are never empty; inserting an empty one is a no-op.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TranslationMapping(BTreeMap<String, Translations>);

impl TranslationMapping {
    /// Creates an empty mapping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the translation of `key` for `lang`, replacing any previous one.
    pub fn insert(&mut self, key: impl Into<String>, lang: impl Into<String>, text: impl Into<String>) {
        self.0.entry(key.into()).or_default().insert(lang.into(), text.into());
    }

    /// Unions `translations` into `key`; languages already present are replaced.
    pub fn insert_all(&mut self, key: impl Into<String>, translations: Translations) {
        if translations.is_empty() {
            return;
        }
        self.0.entry(key.into()).or_default().extend(translations);
    }

    /// Translations of `key`, matched exactly.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Translations> {
        self.0.get(key)
    }

    /// Returns true if `key` has translations.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Merges `other` into `self`; on a shared key and language `other` wins.
    pub fn merge(&mut self, other: Self) {
        for (key, translations) in other.0 {
            self.insert_all(key, translations);
        }
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Every language that has at least one translation.
    #[must_use]
    pub fn languages(&self) -> BTreeSet<String> {
        self.0.values().flat_map(|t| t.keys().cloned()).collect()
    }

    /// Entries in key order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, Translations> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a TranslationMapping {
    type Item = (&'a String, &'a Translations);
    type IntoIter = btree_map::Iter<'a, String, Translations>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<(String, Translations)> for TranslationMapping {
    fn from_iter<I: IntoIterator<Item = (String, Translations)>>(iter: I) -> Self {
        let mut mapping = Self::new();
        for (key, translations) in iter {
            mapping.insert_all(key, translations);
        }
        mapping
    }
}

/// Why a mapping file was rejected.
#[derive(Error, Debug)]
pub enum MappingLoadErrorKind {
    /// The file could not be read.
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// The file is not JSON.
    #[error("invalid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// The JSON is not a `{key: {lang: text}}` object.
    #[error("unsupported shape at {}: {message}", .key.as_deref().unwrap_or("top level"))]
    Shape {
        /// Offending key, `section.key` inside a section; `None` for the top level.
        key: Option<String>,
        /// What was expected there.
        message: String,
    },
}

/// A mapping file that failed to load.
#[derive(Error, Debug)]
#[error("Failed to load mapping '{}': {kind}", .path.display())]
pub struct MappingLoadError {
    /// The mapping file.
    pub path: PathBuf,
    /// What went wrong.
    pub kind: MappingLoadErrorKind,
}

impl MappingLoadError {
    /// Error for `path` from any source convertible into a kind.
    fn new(path: &Path, kind: impl Into<MappingLoadErrorKind>) -> Self {
        Self { path: path.to_path_buf(), kind: kind.into() }
    }

    /// [`MappingLoadErrorKind::Shape`] error at `key`.
    fn shape(path: &Path, key: Option<&str>, message: impl Into<String>) -> Self {
        Self::new(
            path,
            MappingLoadErrorKind::Shape { key: key.map(str::to_string), message: message.into() },
        )
    }
}

/// Sections written by older extractors that hold no `{lang: text}` entries.
const IGNORED_SECTIONS: [&str; 2] = ["old_way", "default_tspans_by_id"];

/// Returns true, with a warning, for sections listed in [`IGNORED_SECTIONS`].
fn is_ignored_section(path: &Path, key: &str) -> bool {
    if !IGNORED_SECTIONS.contains(&key) {
        return false;
    }
    tracing::warn!(section = %key, path = %path.display(), "Skipping unsupported mapping section");
    true
}

/// Stores `translations` under the normalized form of `key`, the form lookups use.
fn insert_entry(mapping: &mut TranslationMapping, key: &str, translations: Translations) {
    let key = normalize_text(key, true);
    if key.is_empty() {
        tracing::debug!("Skipping mapping entry with a blank key");
        return;
    }
    mapping.insert_all(key, translations);
}

/// Reads `value` as a language-to-text object, or `None` if any value is not a string.
fn as_translations(value: &Map<String, Value>) -> Option<Result<Translations, String>> {
    let mut translations = Translations::new();
    for (lang, text) in value {
        let Value::String(text) = text else {
            return None;
        };
        match normalize_lang(lang) {
            Ok(lang) => {
                translations.insert(lang, text.clone());
            }
            Err(e) => return Some(Err(e.to_string())),
        }
    }
    Some(Ok(translations))
}

/// Builds a mapping from parsed JSON.
///
/// Accepts `{key: {lang: text}}` entries, and section objects one level up
/// (`{"new": {key: {lang: text}}}`) which are flattened into the same mapping.
/// Keys are whitespace-normalized. `old_way` and `default_tspans_by_id`
/// sections are skipped.
fn mapping_from_json(path: &Path, json: &Value) -> Result<TranslationMapping, MappingLoadError> {
    let Value::Object(top) = json else {
        return Err(MappingLoadError::shape(path, None, "expected a JSON object"));
    };

    let mut mapping = TranslationMapping::new();
    for (key, value) in top {
        if is_ignored_section(path, key) {
            continue;
        }
        let Value::Object(inner) = value else {
            return Err(MappingLoadError::shape(path, Some(key), "expected an object"));
        };

        match as_translations(inner) {
            Some(Ok(translations)) => insert_entry(&mut mapping, key, translations),
            Some(Err(message)) => return Err(MappingLoadError::shape(path, Some(key), message)),
            None => {
                tracing::debug!(section = %key, path = %path.display(), "Flattening mapping section");
                for (entry_key, entry) in inner {
                    if is_ignored_section(path, entry_key) {
                        continue;
                    }
                    let full_key = format!("{key}.{entry_key}");
                    let translations = match entry {
                        Value::Object(entry) => as_translations(entry),
                        _ => None,
                    };
                    match translations {
                        Some(Ok(translations)) => insert_entry(&mut mapping, entry_key, translations),
                        Some(Err(message)) => {
                            return Err(MappingLoadError::shape(path, Some(&full_key), message));
                        }
                        None => {
                            return Err(MappingLoadError::shape(
                                path,
                                Some(&full_key),
                                "expected an object of strings",
                            ));
                        }
                    }
                }
            }
        }
    }
    Ok(mapping)
}

/// Loads one mapping file.
///
/// # Errors
/// Returns [`MappingLoadError`] naming the file when it cannot be read, is not
/// JSON, or does not have a supported shape.
pub fn load_mapping_file(path: impl AsRef<Path>) -> Result<TranslationMapping, MappingLoadError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| MappingLoadError::new(path, e))?;
    let json: Value = serde_json::from_str(&content).map_err(|e| MappingLoadError::new(path, e))?;
    let mapping = mapping_from_json(path, &json)?;
    tracing::debug!(path = %path.display(), keys = mapping.len(), "Loaded mapping file");
    Ok(mapping)
}

/// Loads and merges mapping files in order; later files win on conflicts.
///
/// # Errors
/// Fails on the first file that cannot be loaded.
pub fn load_all_mappings<P: AsRef<Path>>(
    paths: &[P],
) -> Result<TranslationMapping, MappingLoadError> {
    let mut mapping = TranslationMapping::new();
    for path in paths {
        mapping.merge(load_mapping_file(path)?);
    }
    Ok(mapping)
}

/// Like [`load_all_mappings`], but keeps going past broken files and returns
/// their errors alongside the merged mapping of the others.
#[must_use]
pub fn load_all_mappings_lenient<P: AsRef<Path>>(
    paths: &[P],
) -> (TranslationMapping, Vec<MappingLoadError>) {
    let mut mapping = TranslationMapping::new();
    let mut errors = Vec::new();
    for path in paths {
        match load_mapping_file(path) {
            Ok(loaded) => mapping.merge(loaded),
            Err(e) => {
                tracing::warn!("{e}");
                errors.push(e);
            }
        }
    }
    (mapping, errors)
}

/// Writes `mapping` as pretty JSON, creating parent directories.
///
/// # Errors
/// Returns [`Error::Io`] when the file or its directory cannot be written.
pub fn save_mapping(path: impl AsRef<Path>, mapping: &TranslationMapping) -> Result<(), Error> {
    let path = path.as_ref();
    let io_error = |source: std::io::Error| Error::Io { path: path.to_path_buf(), source };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(io_error)?;
    }
    let mut json = serde_json::to_string_pretty(mapping).map_err(|e| io_error(e.into()))?;
    json.push('\n');
    std::fs::write(path, json).map_err(io_error)?;

    tracing::debug!(path = %path.display(), keys = mapping.len(), "Saved mapping");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use googletest::prelude::*;
    use rstest::rstest;
    use tempfile::TempDir;

    use super::*;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[rstest]
    fn test_insert_and_merge() {
        let mut a = TranslationMapping::new();
        a.insert("hello", "fr", "Bonjour");
        a.insert("hello", "de", "Hallo");

        let mut b = TranslationMapping::new();
        b.insert("hello", "fr", "Salut");
        b.insert("bye", "fr", "Au revoir");

        a.merge(b);

        assert_that!(a.len(), eq(2));
        assert_eq!(a.get("hello").unwrap()["fr"], "Salut");
        assert_eq!(a.get("hello").unwrap()["de"], "Hallo");
        assert_eq!(a.languages().into_iter().collect::<Vec<_>>(), vec!["de", "fr"]);
    }

    #[rstest]
    fn test_empty_translations_are_dropped() {
        let mut mapping = TranslationMapping::new();
        mapping.insert_all("hello", Translations::new());

        assert!(mapping.is_empty());
    }

    #[rstest]
    fn test_load_flat_file() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "a.json", r#"{"hello": {"FR": "Bonjour", "en_us": "Hi"}}"#);

        let mapping = load_mapping_file(&path).unwrap();

        let hello = mapping.get("hello").unwrap();
        assert_eq!(hello.get("fr").map(String::as_str), Some("Bonjour"));
        assert_eq!(hello.get("en-US").map(String::as_str), Some("Hi"));
    }

    #[rstest]
    fn test_load_flattens_sections() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "sections.json",
            r#"{"new": {"hello": {"fr": "Bonjour"}}, "title": {"population 2020": {"fr": "population 2020"}}}"#,
        );

        let mapping = load_mapping_file(&path).unwrap();

        assert_that!(mapping.len(), eq(2));
        assert!(mapping.contains_key("hello"));
        assert!(mapping.contains_key("population 2020"));
    }

    #[rstest]
    fn test_load_skips_legacy_sections() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "legacy.json",
            r#"{
                "new": {"default_tspans_by_id": {"tspan1": "Hello"}, "hello": {"fr": "Bonjour"}},
                "old_way": {"hello": {"_texts": ["Hello"], "_translations": {"fr": ["Bonjour"]}}}
            }"#,
        );

        let mapping = load_mapping_file(&path).unwrap();

        let keys: Vec<&str> = mapping.iter().map(|(key, _)| key.as_str()).collect();
        assert_that!(keys, elements_are![eq(&"hello")]);
        assert!(!mapping.contains_key("default_tspans_by_id"));
    }

    #[rstest]
    #[case::trailing_space(r#"{"title": {"Population ": {"fr": "Population"}}}"#)]
    #[case::inner_newline(r#"{"Population\n": {"fr": "Population"}}"#)]
    #[case::top_level_spaces(r#"{"  Population": {"fr": "Population"}}"#)]
    fn test_load_normalizes_keys(#[case] content: &str) {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "keys.json", content);

        let mapping = load_mapping_file(&path).unwrap();

        assert_that!(mapping.get("Population").map(|t| t["fr"].as_str()), some(eq("Population")));
    }

    #[rstest]
    #[case::array(r#"{"hello": ["fr"]}"#)]
    #[case::number(r#"{"hello": {"fr": 1}}"#)]
    #[case::too_deep(r#"{"a": {"b": {"c": {"fr": "x"}}}}"#)]
    #[case::top_level_array("[]")]
    fn test_load_rejects_unsupported_shapes(#[case] content: &str) {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "bad.json", content);

        let error = load_mapping_file(&path).unwrap_err();

        assert!(matches!(error.kind, MappingLoadErrorKind::Shape { .. }));
        assert_that!(error.to_string(), contains_substring("bad.json"));
    }

    #[rstest]
    fn test_load_all_mappings_later_file_wins() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a.json", r#"{"hello": {"fr": "Bonjour", "de": "Hallo"}}"#);
        let b = write(&dir, "b.json", r#"{"hello": {"fr": "Salut", "ar": "مرحبا"}}"#);
        let empty = write(&dir, "empty.json", "{}");

        let mapping = load_all_mappings(&[a, empty, b]).unwrap();

        let hello = mapping.get("hello").unwrap();
        assert_eq!(hello.len(), 3);
        assert_eq!(hello["fr"], "Salut");
        assert_eq!(hello["de"], "Hallo");
    }

    #[rstest]
    fn test_load_all_mappings_empty_list() {
        let paths: [PathBuf; 0] = [];
        assert!(load_all_mappings(&paths).unwrap().is_empty());
    }

    #[rstest]
    fn test_load_all_mappings_names_bad_file() {
        let dir = TempDir::new().unwrap();
        let good = write(&dir, "good.json", r#"{"a": {"fr": "b"}}"#);
        let bad = write(&dir, "broken.json", "{not json");

        let error = load_all_mappings(&[good, bad]).unwrap_err();

        assert!(matches!(error.kind, MappingLoadErrorKind::Parse(_)));
        assert_that!(error.to_string(), contains_substring("broken.json"));
    }

    #[rstest]
    fn test_lenient_keeps_good_files() {
        let dir = TempDir::new().unwrap();
        let good = write(&dir, "good.json", r#"{"a": {"fr": "b"}}"#);
        let missing = dir.path().join("missing.json");

        let (mapping, errors) = load_all_mappings_lenient(&[good, missing]);

        assert_that!(mapping.len(), eq(1));
        assert_that!(errors, len(eq(1)));
        assert!(matches!(errors[0].kind, MappingLoadErrorKind::Io(_)));
    }

    #[rstest]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/out.json");
        let mut mapping = TranslationMapping::new();
        mapping.insert("but are connected in anti-phase", "ar", "لكنها موصولة بشكل معاكس");

        save_mapping(&path, &mapping).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_that!(content, contains_substring("  \"but are connected in anti-phase\": {"));
        assert_that!(load_mapping_file(&path).unwrap(), eq(&mapping));
    }
}
