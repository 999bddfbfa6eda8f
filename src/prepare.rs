//! Brings SVG documents into the canonical `switch`-of-`text` shape.
//!
//! After [`make_translation_ready`] succeeds every `text` element sits in a
//! `switch`, holds only `tspan` children, carries an `id`, and each switch has
//! at most one text per language with the default text last.

/// Structural checks that reject unsafe documents
mod checks;
/// Grouping of loose `text` elements into `switch` containers
mod grouping;
/// Identifier validation and generation
mod ids;
/// Ordering of texts inside a `switch`
mod order;

use std::sync::LazyLock;

use regex::Regex;
use serde::{
    Deserialize,
    Serialize,
};
use thiserror::Error;

pub(crate) use ids::IdRegistry;
pub use ids::generate_unique_id;
pub use order::{
    reorder_texts,
    sort_switch_texts,
};

use crate::svg::{
    Document,
    NodeId,
    SVG_NS,
};
use crate::text::{
    InvalidLanguageCode,
    split_languages,
};

/// The structural problem found in a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StructureIssue {
    /// No root element.
    NoDocumentElement,
    /// A `style` block with rules beyond simple selectors.
    CssTooComplex,
    /// A `style` block that targets ids.
    CssHasIds,
    /// A `tref` element.
    ContainsTref,
    /// A `tspan` inside another `tspan`.
    NestedTspans,
    /// Text with `$1`-style placeholders.
    TextContainsDollar,
    /// A `text` child that is not a `tspan`.
    NonTspanInsideText,
    /// A `switch` child that is not a `text`.
    SwitchChildNotText,
    /// Visible text directly inside a `switch`.
    SwitchTextOutsideText,
}

impl StructureIssue {
    /// Machine-readable code, stable across releases.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NoDocumentElement => "structure-error-no-doc-element",
            Self::CssTooComplex => "structure-error-css-too-complex",
            Self::CssHasIds => "structure-error-css-has-ids",
            Self::ContainsTref => "structure-error-contains-tref",
            Self::NestedTspans => "structure-error-nested-tspans-not-supported",
            Self::TextContainsDollar => "structure-error-text-contains-dollar",
            Self::NonTspanInsideText => "structure-error-non-tspan-inside-text",
            Self::SwitchChildNotText => "structure-error-switch-child-not-text",
            Self::SwitchTextOutsideText => "structure-error-switch-text-content-outside-text",
        }
    }
}

/// A document shape that cannot be safely canonicalized.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}{}", .issue.code(), format_detail(.detail.as_deref()))]
pub struct SvgStructureError {
    /// What was found.
    pub issue: StructureIssue,
    /// Where, or the offending text.
    pub detail: Option<String>,
}

/// `: detail`, or nothing.
fn format_detail(detail: Option<&str>) -> String {
    detail.map(|d| format!(": {d}")).unwrap_or_default()
}

impl SvgStructureError {
    /// Error without detail.
    #[must_use]
    pub const fn new(issue: StructureIssue) -> Self {
        Self { issue, detail: None }
    }

    /// Error naming the offending node or text.
    #[must_use]
    pub fn with_detail(issue: StructureIssue, detail: impl Into<String>) -> Self {
        Self { issue, detail: Some(detail.into()) }
    }
}

/// Why [`make_translation_ready`] rejected a document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PrepareError {
    /// The document uses markup that cannot be translated safely.
    #[error(transparent)]
    Structure(#[from] SvgStructureError),

    /// A switch has two texts for the same language.
    #[error(
        "Duplicate language '{language}' in switch '{}'",
        .switch_id.as_deref().unwrap_or("<no id>")
    )]
    DuplicateLanguage {
        /// The repeated language code, or `fallback` for two default texts.
        language: String,
        /// Id of the offending switch, if it has one.
        switch_id: Option<String>,
    },

    /// A `text` or `tspan` id cannot be used to derive variant ids.
    #[error("Invalid node id '{id}': {reason}")]
    InvalidId {
        /// The id as written in the document.
        id: String,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// A `systemLanguage` value holds an empty language code.
    #[error(transparent)]
    InvalidLanguage(#[from] InvalidLanguageCode),
}

/// How loose `text` elements are grouped into switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum GroupingPolicy {
    /// Every loose text gets its own switch.
    #[default]
    Standalone,
    /// A language-tagged text with id `{base}-{suffix}` joins the switch of the
    /// sibling default text whose id is `{base}`.
    IdPrefix,
}

/// Settings for [`make_translation_ready`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrepareOptions {
    /// How loose texts are grouped into switches.
    pub grouping: GroupingPolicy,
}

/// What [`make_translation_ready`] changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PrepareReport {
    /// `text` elements after preparation.
    pub texts: usize,
    /// Bare text runs wrapped in a new `tspan`.
    pub spans_wrapped: usize,
    /// Empty `text` and `tspan` elements removed.
    pub empty_nodes_removed: usize,
    /// Switches created around loose texts.
    pub switches_created: usize,
    /// Ids given to texts and spans that had none.
    pub ids_assigned: usize,
    /// Extra variants created from multi-language `systemLanguage` values.
    pub variants_split: usize,
}

/// A namespace written only as entity references, e.g. `&ns_svg;`.
static ENTITY_ONLY: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"^(&[^;]+;)+$").unwrap()
});

/// Concatenated text of `node` and all its descendants, in document order.
#[must_use]
pub fn get_text_content(doc: &Document, node: NodeId) -> String {
    doc.text_content(node)
}

/// Deep, independent copy of `node`; the copy is detached.
pub fn clone_element(doc: &mut Document, node: NodeId) -> NodeId {
    doc.deep_clone(node)
}

/// Rewrites `doc` in place into the canonical injectable form.
///
/// # Errors
/// - [`PrepareError::Structure`] for trefs, ID-based CSS, placeholders, nested
///   spans and unexpected children of `text`/`switch`
/// - [`PrepareError::InvalidId`] for malformed explicit ids
/// - [`PrepareError::InvalidLanguage`] for empty entries in `systemLanguage`
/// - [`PrepareError::DuplicateLanguage`] for two texts claiming one language
pub fn make_translation_ready(
    doc: &mut Document,
    options: &PrepareOptions,
) -> Result<PrepareReport, PrepareError> {
    let Some(root) = doc.root_element() else {
        return Err(SvgStructureError::new(StructureIssue::NoDocumentElement).into());
    };
    ensure_default_namespace(doc, root);

    let mut report = PrepareReport::default();
    if doc.elements_by_name("text").is_empty() {
        tracing::warn!("Document has nothing to translate");
        return Ok(report);
    }

    checks::check_styles(doc)?;
    checks::check_trefs(doc)?;
    checks::check_nested_spans(doc)?;

    report.spans_wrapped = wrap_bare_text(doc);
    let mut ids = IdRegistry::validated(doc)?;
    report.empty_nodes_removed = remove_empty_nodes(doc);

    for text in doc.elements_by_name("text") {
        checks::check_placeholders(doc, text)?;
        checks::check_text_children(doc, text)?;
        normalize_system_language(doc, text)?;
    }

    report.switches_created = grouping::group_loose_texts(doc, options.grouping);

    let switches = doc.elements_by_name("switch");
    for &switch in &switches {
        checks::check_switch_children(doc, switch)?;
        check_duplicate_languages(doc, switch)?;
    }

    report.ids_assigned = ids.assign_missing(doc);
    for &switch in &switches {
        report.variants_split += split_multi_language_texts(doc, switch, &mut ids)?;
    }

    reorder_texts(doc);
    report.texts = doc.elements_by_name("text").len();

    tracing::debug!(?report, "Document is translation ready");
    Ok(report)
}

/// Default text of a switch: the first `text` child without `systemLanguage`.
#[must_use]
pub fn default_text(doc: &Document, switch: NodeId) -> Option<NodeId> {
    switch_texts(doc, switch).into_iter().find(|&t| doc.attribute(t, "systemLanguage").is_none())
}

/// `text` children of a switch, in order.
#[must_use]
pub fn switch_texts(doc: &Document, switch: NodeId) -> Vec<NodeId> {
    doc.child_elements(switch).into_iter().filter(|&c| doc.is_element(c, "text")).collect()
}

/// Sets `xmlns` on the root when it is missing or unresolved.
fn ensure_default_namespace(doc: &mut Document, root: NodeId) {
    let needs_fix =
        doc.attribute(root, "xmlns").is_none_or(|ns| ENTITY_ONLY.is_match(ns.trim()));
    if needs_fix {
        tracing::debug!("Setting default SVG namespace on root element");
        doc.set_attribute(root, "xmlns", SVG_NS);
    }
}

/// Moves bare text runs of every `text` element into their own `tspan`.
///
/// The run before the first child element takes over the parent's `x`/`y`.
fn wrap_bare_text(doc: &mut Document) -> usize {
    let mut wrapped = 0;
    for text in doc.elements_by_name("text") {
        let prefix = doc.element(text).map(|e| e.prefix().to_string()).unwrap_or_default();
        let mut seen_element = false;

        for child in doc.children(text).to_vec() {
            if doc.element(child).is_some() {
                seen_element = true;
                continue;
            }
            let Some(content) = doc.text(child) else {
                continue;
            };
            if content.trim().is_empty() {
                continue;
            }

            let span = doc.create_element(format!("{prefix}tspan"));
            if !seen_element {
                for name in ["x", "y"] {
                    if let Some(value) = doc.attribute(text, name).map(str::to_string) {
                        doc.set_attribute(span, name, value);
                    }
                }
            }
            doc.insert_before(child, span);
            doc.append_child(span, child);
            seen_element = true;
            wrapped += 1;
        }
    }
    wrapped
}

/// Returns true if `node` holds any non-whitespace text.
fn has_visible_text(doc: &Document, node: NodeId) -> bool {
    !doc.text_content(node).trim().is_empty()
}

/// Removes spans, then texts, that have no element children and no visible text.
fn remove_empty_nodes(doc: &mut Document) -> usize {
    let mut removed = 0;
    for name in ["tspan", "text"] {
        for node in doc.elements_by_name(name) {
            if doc.child_elements(node).is_empty() && !has_visible_text(doc, node) {
                tracing::debug!(id = ?doc.attribute(node, "id"), "Removing empty <{name}>");
                doc.detach(node);
                removed += 1;
            }
        }
    }
    removed
}

/// Canonicalizes the codes of `systemLanguage`; a blank value is removed.
fn normalize_system_language(doc: &mut Document, text: NodeId) -> Result<(), PrepareError> {
    let Some(value) = doc.attribute(text, "systemLanguage").map(str::to_string) else {
        return Ok(());
    };
    if value.trim().is_empty() {
        doc.remove_attribute(text, "systemLanguage");
        return Ok(());
    }
    let codes = split_languages(&value)?;
    doc.set_attribute(text, "systemLanguage", codes.join(","));
    Ok(())
}

/// Fails when two texts of `switch` share a language, or both are defaults.
fn check_duplicate_languages(doc: &Document, switch: NodeId) -> Result<(), PrepareError> {
    let mut seen = std::collections::HashSet::new();
    let duplicate = |language: &str| PrepareError::DuplicateLanguage {
        language: language.to_string(),
        switch_id: doc.attribute(switch, "id").map(str::to_string),
    };

    for text in switch_texts(doc, switch) {
        match doc.attribute(text, "systemLanguage") {
            None => {
                if !seen.insert("fallback") {
                    return Err(duplicate("fallback"));
                }
            }
            Some(languages) => {
                for code in languages.split(',') {
                    if !seen.insert(code) {
                        return Err(duplicate(code));
                    }
                }
            }
        }
    }
    Ok(())
}

/// Replaces each text tagged with several languages by one clone per language.
fn split_multi_language_texts(
    doc: &mut Document,
    switch: NodeId,
    ids: &mut IdRegistry,
) -> Result<usize, PrepareError> {
    let base_id = default_text(doc, switch).and_then(|d| doc.attribute(d, "id")).map(str::to_string);
    let mut split = 0;

    for text in switch_texts(doc, switch) {
        let Some(value) = doc.attribute(text, "systemLanguage").map(str::to_string) else {
            continue;
        };
        if !value.contains(',') {
            continue;
        }

        let own_id = doc.attribute(text, "id").unwrap_or_default().to_string();
        let base = base_id.clone().unwrap_or(own_id);
        for code in split_languages(&value)? {
            let clone = doc.deep_clone(text);
            doc.set_attribute(clone, "systemLanguage", code.as_str());
            let id = ids.derive(&base, &code);
            doc.set_attribute(clone, "id", id);
            ids.derive_span_ids(doc, clone, &code);
            doc.insert_before(text, clone);
            split += 1;
        }
        doc.detach(text);
    }
    Ok(split)
}
