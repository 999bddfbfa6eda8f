use std::sync::LazyLock;

use regex::Regex;

use super::{
    StructureIssue,
    SvgStructureError,
};
use crate::svg::{
    Document,
    NodeId,
    NodeKind,
};

/// A stylesheet made only of flat `selector { declarations }` rules.
static FLAT_CSS: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"^([^{}]+\{[^{}]*\})*[^{}]*$").unwrap()
});

/// The `{ ... }` body of a rule.
static CSS_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"\{[^}]*\}").unwrap()
});

/// Positional placeholders used by translation templates (`$1`, `$2`, ...).
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"\$[0-9]+").unwrap()
});

/// The id of `node`, or its element name.
fn node_label(doc: &Document, node: NodeId) -> String {
    doc.attribute(node, "id").map_or_else(
        || doc.element(node).map(|e| e.name.clone()).unwrap_or_default(),
        str::to_string,
    )
}

/// Rejects stylesheets with ID selectors, since ids are rewritten later.
pub(super) fn check_styles(doc: &Document) -> Result<(), SvgStructureError> {
    for style in doc.elements_by_name("style") {
        let css = doc.text_content(style);
        if !css.contains('#') {
            continue;
        }
        if !FLAT_CSS.is_match(&css) {
            return Err(SvgStructureError::new(StructureIssue::CssTooComplex));
        }
        if let Some(selector) = CSS_BLOCK.split(&css).find(|selector| selector.contains('#')) {
            return Err(SvgStructureError::with_detail(
                StructureIssue::CssHasIds,
                selector.trim(),
            ));
        }
    }
    Ok(())
}

/// Rejects `tref`, whose referenced text cannot be translated in place.
pub(super) fn check_trefs(doc: &Document) -> Result<(), SvgStructureError> {
    doc.elements_by_name("tref").first().map_or(Ok(()), |&tref| {
        Err(SvgStructureError::with_detail(StructureIssue::ContainsTref, node_label(doc, tref)))
    })
}

/// Rejects a `tspan` that contains elements.
pub(super) fn check_nested_spans(doc: &Document) -> Result<(), SvgStructureError> {
    for span in doc.elements_by_name("tspan") {
        if !doc.child_elements(span).is_empty() {
            return Err(SvgStructureError::with_detail(
                StructureIssue::NestedTspans,
                node_label(doc, span),
            ));
        }
    }
    Ok(())
}

/// Rejects text holding `$n` placeholders.
pub(super) fn check_placeholders(doc: &Document, text: NodeId) -> Result<(), SvgStructureError> {
    let content = doc.text_content(text);
    if PLACEHOLDER.is_match(&content) {
        return Err(SvgStructureError::with_detail(
            StructureIssue::TextContainsDollar,
            content.trim(),
        ));
    }
    Ok(())
}

/// Rejects `text` children other than `tspan`.
pub(super) fn check_text_children(doc: &Document, text: NodeId) -> Result<(), SvgStructureError> {
    for child in doc.child_elements(text) {
        if !doc.is_element(child, "tspan") {
            let name = doc.element(child).map(|e| e.name.clone()).unwrap_or_default();
            return Err(SvgStructureError::with_detail(StructureIssue::NonTspanInsideText, name));
        }
    }
    Ok(())
}

/// Rejects non-`text` elements and visible text directly inside a switch.
pub(super) fn check_switch_children(
    doc: &Document,
    switch: NodeId,
) -> Result<(), SvgStructureError> {
    for &child in doc.children(switch) {
        match doc.kind(child) {
            NodeKind::Element(element) if element.local_name() != "text" => {
                return Err(SvgStructureError::with_detail(
                    StructureIssue::SwitchChildNotText,
                    element.name.clone(),
                ));
            }
            NodeKind::Text(content)
            | NodeKind::CData(content)
            | NodeKind::EntityText { text: content, .. }
                if !content.trim().is_empty() =>
            {
                return Err(SvgStructureError::with_detail(
                    StructureIssue::SwitchTextOutsideText,
                    content.trim(),
                ));
            }
            _ => {}
        }
    }
    Ok(())
}
