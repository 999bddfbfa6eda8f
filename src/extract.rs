//! Builds a [`TranslationMapping`] from the switch groups of a prepared document.

use std::path::Path;

use crate::error::Error;
use crate::mapping::{
    TranslationMapping,
    Translations,
};
use crate::prepare::{
    PrepareError,
    PrepareOptions,
    make_translation_ready,
    switch_texts,
};
use crate::svg::{
    Document,
    NodeId,
};
use crate::text::{
    normalize_lang,
    normalize_text,
    split_year_suffix,
};

/// Settings for [`extract`] and [`extract_file`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Keys keep their case when true.
    pub case_sensitive: bool,
    /// How the document is prepared before reading it.
    pub prepare: PrepareOptions,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self { case_sensitive: true, prepare: PrepareOptions::default() }
    }
}

/// Lines of a locus: the trimmed text of each `tspan`, or of the `text`
/// itself when it has no spans.
pub(crate) fn locus_lines(doc: &Document, text: NodeId) -> Vec<String> {
    let spans: Vec<NodeId> =
        doc.child_elements(text).into_iter().filter(|&c| doc.is_element(c, "tspan")).collect();
    if spans.is_empty() {
        return vec![doc.text_content(text).trim().to_string()];
    }
    spans.into_iter().map(|span| doc.text_content(span).trim().to_string()).collect()
}

/// Translation key of a locus.
pub(crate) fn locus_key(doc: &Document, text: NodeId, case_sensitive: bool) -> String {
    normalize_text(&locus_lines(doc, text).join(" "), case_sensitive)
}

/// Translated text of a variant: its lines joined with `\n`.
pub(crate) fn translated_text(doc: &Document, text: NodeId) -> String {
    locus_lines(doc, text).join("\n")
}

/// Strips a shared trailing year from `key` and every translation.
///
/// Returns `None` unless the key ends in a year and every translation ends in
/// that same year.
fn strip_shared_year(key: &str, translations: &Translations) -> Option<(String, Translations)> {
    let (stem, year) = split_year_suffix(key)?;
    let mut stripped = Translations::new();
    for (lang, text) in translations {
        match split_year_suffix(text) {
            Some((text_stem, text_year)) if text_year == year => {
                stripped.insert(lang.clone(), text_stem.to_string());
            }
            _ => return None,
        }
    }
    Some((stem.to_string(), stripped))
}

/// Extracts every switch group of a prepared document.
///
/// Groups without a default text, with an empty key or without variants are
/// skipped. When two groups share a key their languages are merged and the
/// later group wins on conflicts.
///
/// # Errors
/// Returns [`PrepareError::InvalidLanguage`] when a variant's `systemLanguage`
/// cannot be normalized.
pub fn extract(doc: &Document, case_sensitive: bool) -> Result<TranslationMapping, PrepareError> {
    let mut mapping = TranslationMapping::new();
    let mut processed = 0;

    for switch in doc.elements_by_name("switch") {
        let texts = switch_texts(doc, switch);
        let Some(&default) =
            texts.iter().find(|&&t| doc.attribute(t, "systemLanguage").is_none())
        else {
            tracing::debug!(switch = ?doc.attribute(switch, "id"), "Skipping switch without default text");
            continue;
        };

        let key = locus_key(doc, default, case_sensitive);
        if key.is_empty() {
            continue;
        }

        let mut translations = Translations::new();
        for &text in &texts {
            let Some(lang) = doc.attribute(text, "systemLanguage") else {
                continue;
            };
            translations.insert(normalize_lang(lang)?, translated_text(doc, text));
        }
        if translations.is_empty() {
            continue;
        }

        if let Some((stem, stripped)) = strip_shared_year(&key, &translations) {
            tracing::debug!(key = %key, stem = %stem, "Registering year-less key");
            mapping.insert_all(stem, stripped);
        }
        mapping.insert_all(key, translations);
        processed += 1;
    }

    tracing::debug!(processed, keys = mapping.len(), "Extracted translations");
    Ok(mapping)
}

/// Loads, prepares and extracts one SVG file.
///
/// # Errors
/// Returns [`Error`] when the file cannot be read, parsed or prepared.
pub fn extract_file(
    path: impl AsRef<Path>,
    options: &ExtractOptions,
) -> Result<TranslationMapping, Error> {
    let path = path.as_ref();
    let mut doc = Document::load(path)?;
    make_translation_ready(&mut doc, &options.prepare)?;
    let mapping = extract(&doc, options.case_sensitive)?;
    if mapping.is_empty() {
        tracing::warn!(path = %path.display(), "No translations found");
    }
    Ok(mapping)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use googletest::prelude::*;
    use rstest::rstest;

    use super::*;

    fn extract_xml(xml: &str, case_sensitive: bool) -> TranslationMapping {
        let mut doc = Document::parse(xml).unwrap();
        make_translation_ready(&mut doc, &PrepareOptions::default()).unwrap();
        extract(&doc, case_sensitive).unwrap()
    }

    #[rstest]
    fn test_extract_single_switch() {
        let mapping = extract_xml(
            r#"<svg><switch><text systemLanguage="ar"><tspan>لكنها موصولة بشكل معاكس</tspan></text><text><tspan>but are connected in anti-phase</tspan></text></switch></svg>"#,
            true,
        );

        let entry = mapping.get("but are connected in anti-phase").unwrap();
        assert_eq!(entry["ar"], "لكنها موصولة بشكل معاكس");
    }

    #[rstest]
    fn test_extract_multi_span_variant() {
        let mapping = extract_xml(
            r#"<svg><switch><text systemLanguage="fr"><tspan> Première </tspan><tspan>ligne</tspan></text><text><tspan>First</tspan>
<tspan>line</tspan></text></switch></svg>"#,
            true,
        );

        assert_eq!(mapping.get("First line").unwrap()["fr"], "Première\nligne");
    }

    #[rstest]
    fn test_extract_case_insensitive_key() {
        let mapping = extract_xml(
            r#"<svg><switch><text systemLanguage="de">Hallo Welt</text><text>Hello   World</text></switch></svg>"#,
            false,
        );

        assert!(mapping.contains_key("hello world"));
        assert_eq!(mapping.get("hello world").unwrap()["de"], "Hallo Welt");
    }

    #[rstest]
    #[case::no_default(r#"<svg><switch><text systemLanguage="fr">Bonjour</text></switch></svg>"#)]
    #[case::no_variants("<svg><switch><text>Hello</text></switch></svg>")]
    #[case::no_switch("<svg><rect/></svg>")]
    fn test_extract_skips_incomplete_groups(#[case] xml: &str) {
        assert!(extract_xml(xml, true).is_empty());
    }

    #[rstest]
    fn test_extract_merges_shared_keys() {
        let mapping = extract_xml(
            r#"<svg>
<switch><text systemLanguage="fr">Oui</text><text>Yes</text></switch>
<switch><text systemLanguage="fr">Ouais</text><text systemLanguage="de">Ja</text><text>Yes</text></switch>
</svg>"#,
            true,
        );

        let yes = mapping.get("Yes").unwrap();
        assert_eq!(yes["fr"], "Ouais");
        assert_eq!(yes["de"], "Ja");
    }

    #[rstest]
    fn test_extract_registers_year_less_key() {
        let mapping = extract_xml(
            r#"<svg><switch><text systemLanguage="fr">Population 2020</text><text systemLanguage="de">Bevölkerung 2020</text><text>Population 2020</text></switch></svg>"#,
            true,
        );

        assert_that!(mapping.len(), eq(2));
        let stem = mapping.get("Population").unwrap();
        assert_eq!(stem["fr"], "Population");
        assert_eq!(stem["de"], "Bevölkerung");
    }

    #[rstest]
    fn test_extract_year_rule_needs_every_translation() {
        let mapping = extract_xml(
            r#"<svg><switch><text systemLanguage="fr">Population 2020</text><text systemLanguage="de">Bevölkerung</text><text>Population 2020</text></switch></svg>"#,
            true,
        );

        assert_that!(mapping.len(), eq(1));
        assert!(!mapping.contains_key("Population"));
    }

    #[rstest]
    fn test_extract_year_after_no_break_space() {
        let mapping = extract_xml(
            "<svg><switch><text systemLanguage=\"fr\">Population\u{a0}2020</text><text>Population 2020</text></switch></svg>",
            true,
        );

        assert_eq!(mapping.get("Population 2020").unwrap()["fr"], "Population\u{a0}2020");
        assert_eq!(mapping.get("Population").unwrap()["fr"], "Population");
    }
}
