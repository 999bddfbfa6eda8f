use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::LazyLock;

use quick_xml::Reader;
use quick_xml::escape::unescape;
use quick_xml::events::{
    BytesStart,
    BytesText,
    Event,
};
use regex::{
    Captures,
    Regex,
};

use super::document::{
    Attribute,
    Declaration,
    Document,
    Element,
    NodeKind,
};
use super::XmlError;

/// Bytes as text; invalid UTF-8 is replaced.
fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// [`XmlError::Parse`] at `position`.
fn parse_error(position: u64, error: impl std::fmt::Display) -> XmlError {
    XmlError::Parse { position, message: error.to_string() }
}

/// `<!ENTITY name "value">` in a doctype internal subset.
static ENTITY_DECL: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r#"<!ENTITY\s+([^\s%"']+)\s+(?:"([^"]*)"|'([^']*)')\s*>"#).unwrap()
});

/// A general or character reference.
static ENTITY_REF: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"&([^;&\s]+);").unwrap()
});

/// Internal entities declared by a doctype, by name.
fn declared_entities(doctype: &str) -> HashMap<String, String> {
    ENTITY_DECL
        .captures_iter(doctype)
        .filter_map(|caps| {
            let name = caps.get(1)?.as_str().to_string();
            let value = caps.get(2).or_else(|| caps.get(3))?.as_str().to_string();
            Some((name, value))
        })
        .collect()
}

/// Replaces the references in `raw` that can be resolved. Unknown entities
/// stay as written.
fn resolve_references(raw: &str, entities: &HashMap<String, String>) -> String {
    ENTITY_REF
        .replace_all(raw, |caps: &Captures<'_>| {
            let reference = caps.get(0).map_or("", |m| m.as_str());
            let name = caps.get(1).map_or("", |m| m.as_str());
            unescape(reference)
                .map(Cow::into_owned)
                .ok()
                .or_else(|| entities.get(name).cloned())
                .unwrap_or_else(|| reference.to_string())
        })
        .into_owned()
}

/// Text node for a text event. Markup with custom entities becomes
/// [`NodeKind::EntityText`].
fn text_node(text: &BytesText<'_>, entities: &HashMap<String, String>) -> NodeKind {
    text.unescape().map_or_else(
        |_| {
            let raw = lossy(text);
            NodeKind::EntityText { text: resolve_references(&raw, entities), raw }
        },
        |content| NodeKind::Text(content.into_owned()),
    )
}

/// Builds a [`Document`] from markup, keeping whitespace, comments and the
/// doctype so the document can be written back with minimal churn.
///
/// Entities declared in the doctype are resolved for reading. Text and
/// attribute values that use custom entities keep their source markup, so
/// they are written back unchanged.
pub(super) fn parse_document(xml: &str) -> Result<Document, XmlError> {
    let mut reader = Reader::from_str(xml);
    let mut doc = Document::new();
    let mut stack = vec![doc.root()];
    let mut entities = HashMap::new();

    loop {
        let position = reader.buffer_position();
        let event = reader.read_event().map_err(|e| parse_error(position, e))?;
        let parent = stack.last().copied().unwrap_or_else(|| doc.root());

        match event {
            Event::Start(start) => {
                let element = element_from_start(&start, position, &entities)?;
                let id = doc.create_node(NodeKind::Element(element));
                doc.append_child(parent, id);
                stack.push(id);
            }
            Event::Empty(start) => {
                let element = element_from_start(&start, position, &entities)?;
                let id = doc.create_node(NodeKind::Element(element));
                doc.append_child(parent, id);
            }
            Event::End(_) => {
                if stack.len() > 1 {
                    stack.pop();
                }
            }
            Event::Text(text) => {
                let node = text_node(&text, &entities);
                // Whitespace between the prolog and the root element is layout only.
                if parent == doc.root()
                    && matches!(&node, NodeKind::Text(content) if content.trim().is_empty())
                {
                    continue;
                }
                let id = doc.create_node(node);
                doc.append_child(parent, id);
            }
            Event::CData(data) => {
                let id = doc.create_node(NodeKind::CData(lossy(&data)));
                doc.append_child(parent, id);
            }
            Event::Comment(comment) => {
                let id = doc.create_node(NodeKind::Comment(lossy(&comment)));
                doc.append_child(parent, id);
            }
            Event::PI(pi) => {
                let id = doc.create_node(NodeKind::ProcessingInstruction(lossy(&pi)));
                doc.append_child(parent, id);
            }
            Event::DocType(doctype) => {
                let doctype = lossy(&doctype).trim().to_string();
                entities.extend(declared_entities(&doctype));
                let id = doc.create_node(NodeKind::DocType(doctype));
                doc.append_child(parent, id);
            }
            Event::Decl(decl) => {
                let version = decl.version().map_or_else(|_| "1.0".to_string(), |v| lossy(&v));
                let encoding = decl.encoding().and_then(Result::ok).map(|v| lossy(&v));
                let standalone = decl.standalone().and_then(Result::ok).map(|v| lossy(&v));
                doc.declaration = Some(Declaration { version, encoding, standalone });
            }
            Event::Eof => break,
        }
    }

    if let Some(&open) = stack.get(1) {
        let name = doc.element(open).map(|e| e.name.clone()).unwrap_or_default();
        return Err(XmlError::UnclosedElement(name));
    }

    if doc.root_element().is_none() {
        return Err(XmlError::NoRootElement);
    }

    Ok(doc)
}

/// Element with its attributes unescaped the same way as text.
fn element_from_start(
    start: &BytesStart<'_>,
    position: u64,
    entities: &HashMap<String, String>,
) -> Result<Element, XmlError> {
    let mut element = Element::new(lossy(start.name().as_ref()));
    for attr in start.attributes() {
        let attr = attr.map_err(|e| parse_error(position, e))?;
        let name = lossy(attr.key.as_ref());
        let (value, raw) = attr.unescape_value().map_or_else(
            |_| {
                let raw = lossy(&attr.value);
                (resolve_references(&raw, entities), Some(raw))
            },
            |value| (value.into_owned(), None),
        );
        element.attributes.push(Attribute { name, value, raw });
    }
    Ok(element)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use googletest::prelude::*;
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn test_parse_keeps_structure() {
        let doc = parse_document(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!-- exported -->
<svg xmlns="http://www.w3.org/2000/svg" width="10"><text id="a">A &amp; B</text><rect/></svg>"#,
        )
        .unwrap();

        let svg = doc.root_element().unwrap();
        assert_eq!(doc.attribute(svg, "width"), Some("10"));
        let text = doc.elements_by_name("text")[0];
        assert_that!(doc.text_content(text), eq("A & B"));
        assert_that!(doc.elements_by_name("rect"), len(eq(1)));
        assert!(matches!(doc.kind(doc.children(doc.root())[0]), NodeKind::Comment(_)));
        assert!(doc.declaration.is_some());
    }

    #[rstest]
    fn test_parse_unknown_entity_is_kept_verbatim() {
        let doc = parse_document(r#"<svg xmlns="&ns_svg;"><text>x</text></svg>"#).unwrap();
        let svg = doc.root_element().unwrap();
        assert_eq!(doc.attribute(svg, "xmlns"), Some("&ns_svg;"));
    }

    #[rstest]
    fn test_parse_resolves_declared_entities() {
        let doc = parse_document(
            r#"<!DOCTYPE svg [
	<!ENTITY ns_x "http://ns.example.com/x/">
	<!ENTITY label 'Tree'>
]>
<svg xmlns:x="&ns_x;"><text>A &amp; &label; &#65; &unknown;</text></svg>"#,
        )
        .unwrap();

        let svg = doc.root_element().unwrap();
        assert_eq!(doc.attribute(svg, "xmlns:x"), Some("http://ns.example.com/x/"));
        let text = doc.elements_by_name("text")[0];
        assert_that!(doc.text_content(text), eq("A & Tree A &unknown;"));
    }

    #[rstest]
    #[case::mismatched_end("<svg><text></svg>")]
    #[case::unclosed("<svg><text>")]
    #[case::no_root("<!-- nothing here -->")]
    #[case::empty("")]
    fn test_parse_rejects_malformed(#[case] xml: &str) {
        assert_that!(parse_document(xml), err(anything()));
    }
}
