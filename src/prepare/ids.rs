use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use super::{
    PrepareError,
    default_text,
};
use crate::svg::{
    Document,
    NodeId,
};

/// Ids handed out by [`IdRegistry::generate`].
static GENERATED_ID: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"^trsvg([0-9]+)$").unwrap()
});

/// Returns `{base}-{lang}`, or the first free `{base}-{lang}-{n}` for n = 1, 2, ...
///
/// # Examples
/// ```
/// use std::collections::HashSet;
///
/// use svg_translate::prepare::generate_unique_id;
///
/// let taken: HashSet<String> = ["title-fr".to_string()].into();
/// assert_eq!(generate_unique_id("title", "fr", &taken), "title-fr-1");
/// assert_eq!(generate_unique_id("title", "de", &taken), "title-de");
/// ```
#[must_use]
pub fn generate_unique_id(base: &str, lang: &str, existing: &HashSet<String>) -> String {
    let candidate = format!("{base}-{lang}");
    if !existing.contains(&candidate) {
        return candidate;
    }
    (1_u64..)
        .map(|n| format!("{candidate}-{n}"))
        .find(|id| !existing.contains(id))
        .unwrap_or(candidate)
}

/// Tracks the ids used by a document and hands out fresh ones.
#[derive(Debug, Clone)]
pub(crate) struct IdRegistry {
    /// Every id present in the document or handed out since.
    in_use: HashSet<String>,
    /// Counter for the next `trsvg<N>` candidate; numbering starts at 1.
    next_generated: u64,
}

impl Default for IdRegistry {
    fn default() -> Self {
        Self { in_use: HashSet::new(), next_generated: 1 }
    }
}

impl IdRegistry {
    /// Registers every id of `doc` and continues numbering after its highest `trsvg<N>`.
    pub(crate) fn from_document(doc: &Document) -> Self {
        let in_use = doc.ids_in_use();
        let next_generated = in_use
            .iter()
            .filter_map(|id| GENERATED_ID.captures(id))
            .filter_map(|caps| caps.get(1)?.as_str().parse::<u64>().ok())
            .max()
            .map_or(1, |max| max + 1);
        Self { in_use, next_generated }
    }

    /// Validates the explicit ids of `text`/`tspan` nodes, then registers every id.
    ///
    /// Ids are trimmed; purely numeric ids are dropped so they get regenerated.
    pub(super) fn validated(doc: &mut Document) -> Result<Self, PrepareError> {
        let nodes: Vec<NodeId> =
            doc.elements_by_name("tspan").into_iter().chain(doc.elements_by_name("text")).collect();

        for node in nodes {
            let Some(raw) = doc.attribute(node, "id").map(str::to_string) else {
                continue;
            };
            let id = raw.trim();
            let invalid = |reason| PrepareError::InvalidId { id: raw.clone(), reason };

            if id.is_empty() {
                return Err(invalid("id is empty"));
            }
            if id.chars().any(char::is_whitespace) {
                return Err(invalid("id contains whitespace"));
            }
            if id.contains('|') || id.contains('/') {
                return Err(invalid("id contains '|' or '/'"));
            }

            if id.bytes().all(|b| b.is_ascii_digit()) {
                tracing::debug!(id, "Dropping numeric id");
                doc.remove_attribute(node, "id");
            } else if id != raw {
                doc.set_attribute(node, "id", id);
            }
        }

        Ok(Self::from_document(doc))
    }

    /// Returns true if `id` is taken.
    #[cfg(test)]
    pub(crate) fn contains(&self, id: &str) -> bool {
        self.in_use.contains(id)
    }

    /// Next free `trsvg<N>` id.
    pub(crate) fn generate(&mut self) -> String {
        loop {
            let id = format!("trsvg{}", self.next_generated);
            self.next_generated += 1;
            if self.in_use.insert(id.clone()) {
                return id;
            }
        }
    }

    /// Free id derived from `base` for `lang`, reserved on return.
    pub(crate) fn derive(&mut self, base: &str, lang: &str) -> String {
        let id = generate_unique_id(base, lang, &self.in_use);
        self.in_use.insert(id.clone());
        id
    }

    /// Rewrites every `tspan` id below `node` into a derived id for `lang`.
    pub(crate) fn derive_span_ids(&mut self, doc: &mut Document, node: NodeId, lang: &str) {
        for span in doc.descendants(node) {
            if !doc.is_element(span, "tspan") {
                continue;
            }
            let base = doc.attribute(span, "id").map(str::to_string);
            let id = match base {
                Some(base) => self.derive(&base, lang),
                None => self.generate(),
            };
            doc.set_attribute(span, "id", id);
        }
    }

    /// Gives every `text`/`tspan` without an id one.
    ///
    /// Defaults and spans get `trsvg<N>`; a language variant gets an id derived
    /// from its switch's default text.
    pub(super) fn assign_missing(&mut self, doc: &mut Document) -> usize {
        let mut assigned = 0;

        let (variants, defaults): (Vec<NodeId>, Vec<NodeId>) = doc
            .elements_by_name("text")
            .into_iter()
            .partition(|&t| doc.attribute(t, "systemLanguage").is_some());

        for node in defaults.into_iter().chain(doc.elements_by_name("tspan")) {
            if doc.attribute(node, "id").is_none() {
                let id = self.generate();
                doc.set_attribute(node, "id", id);
                assigned += 1;
            }
        }

        for text in variants {
            if doc.attribute(text, "id").is_some() {
                continue;
            }
            let base = doc
                .parent(text)
                .and_then(|switch| default_text(doc, switch))
                .and_then(|default| doc.attribute(default, "id"))
                .map(str::to_string);
            let id = match (base, doc.attribute(text, "systemLanguage")) {
                (Some(base), Some(lang)) => {
                    let lang = lang.to_string();
                    self.derive(&base, &lang)
                }
                _ => self.generate(),
            };
            doc.set_attribute(text, "id", id);
            assigned += 1;
        }

        assigned
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use googletest::prelude::*;
    use rstest::rstest;

    use super::*;

    fn taken(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|id| (*id).to_string()).collect()
    }

    #[rstest]
    #[case::free("id", "ar", &[], "id-ar")]
    #[case::first_taken("id", "ar", &["id-ar"], "id-ar-1")]
    #[case::several_taken("id", "ar", &["id-ar", "id-ar-1", "id-ar-2"], "id-ar-3")]
    #[case::empty_base("", "ar", &[], "-ar")]
    fn test_generate_unique_id(
        #[case] base: &str,
        #[case] lang: &str,
        #[case] existing: &[&str],
        #[case] expected: &str,
    ) {
        assert_that!(generate_unique_id(base, lang, &taken(existing)), eq(expected));
    }

    #[rstest]
    fn test_generate_unique_id_skips_long_runs() {
        let mut existing = taken(&["id-ar"]);
        existing.extend((1..100).map(|n| format!("id-ar-{n}")));

        assert_that!(generate_unique_id("id", "ar", &existing), eq("id-ar-100"));
    }

    #[rstest]
    fn test_registry_continues_after_highest_generated_id() {
        let doc = Document::parse(r#"<svg><text id="trsvg3"/><text id="trsvg10"/></svg>"#).unwrap();
        let mut registry = IdRegistry::from_document(&doc);

        assert_that!(registry.generate(), eq("trsvg11"));
        assert_that!(registry.generate(), eq("trsvg12"));
        assert!(registry.contains("trsvg3"));
    }

    #[rstest]
    fn test_registry_numbering_starts_at_one() {
        let doc = Document::parse(r#"<svg><text id="trsvg2"/></svg>"#).unwrap();
        let mut fresh = IdRegistry::from_document(&Document::parse("<svg/>").unwrap());
        let mut taken = IdRegistry::from_document(&doc);

        assert_that!(fresh.generate(), eq("trsvg1"));
        assert_that!(IdRegistry::default().generate(), eq("trsvg1"));
        assert_that!(taken.generate(), eq("trsvg3"));
    }

    #[rstest]
    fn test_derive_reserves_id() {
        let mut registry = IdRegistry::default();

        assert_that!(registry.derive("t", "fr"), eq("t-fr"));
        assert_that!(registry.derive("t", "fr"), eq("t-fr-1"));
    }

    #[rstest]
    fn test_validated_trims_and_drops_numeric_ids() {
        let mut doc =
            Document::parse(r#"<svg><text id=" label "><tspan id="42">x</tspan></text></svg>"#)
                .unwrap();
        let registry = IdRegistry::validated(&mut doc).unwrap();

        let text = doc.elements_by_name("text")[0];
        let span = doc.elements_by_name("tspan")[0];
        assert_eq!(doc.attribute(text, "id"), Some("label"));
        assert_eq!(doc.attribute(span, "id"), None);
        assert!(!registry.contains("42"));
    }
}
