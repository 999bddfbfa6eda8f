use std::borrow::Cow;

use quick_xml::Writer;
use quick_xml::escape::{
    escape,
    partial_escape,
};
use quick_xml::events::{
    BytesCData,
    BytesDecl,
    BytesEnd,
    BytesPI,
    BytesStart,
    BytesText,
    Event,
};

use super::XmlError;
use super::document::{
    Document,
    NodeId,
    NodeKind,
};

/// [`XmlError::Write`] from any writer error.
fn write_error(error: impl std::fmt::Display) -> XmlError {
    XmlError::Write(error.to_string())
}

/// Serializes `doc`, declaration first, with top-level nodes on separate lines.
pub(super) fn write_document(doc: &Document) -> Result<String, XmlError> {
    let mut writer = Writer::new(Vec::new());

    if let Some(decl) = &doc.declaration {
        let event = BytesDecl::new(&decl.version, decl.encoding.as_deref(), decl.standalone.as_deref());
        writer.write_event(Event::Decl(event)).map_err(write_error)?;
        writer.write_event(Event::Text(BytesText::new("\n"))).map_err(write_error)?;
    }

    let top_level = doc.children(doc.root());
    for (index, &child) in top_level.iter().enumerate() {
        write_node(doc, child, &mut writer)?;
        if index + 1 < top_level.len() {
            writer.write_event(Event::Text(BytesText::new("\n"))).map_err(write_error)?;
        }
    }

    String::from_utf8(writer.into_inner()).map_err(write_error)
}

/// Writes `id` and its subtree.
fn write_node(doc: &Document, id: NodeId, writer: &mut Writer<Vec<u8>>) -> Result<(), XmlError> {
    match doc.kind(id) {
        NodeKind::Root => {
            for &child in doc.children(id) {
                write_node(doc, child, writer)?;
            }
        }
        NodeKind::Element(element) => {
            let mut start = BytesStart::new(element.name.as_str());
            for attr in &element.attributes {
                // Byte pairs are pushed as is, so the value is escaped here.
                let value = attr.raw.as_deref().map_or_else(
                    || escape(attr.value.as_str()),
                    |raw| Cow::Owned(raw.replace('"', "&quot;")),
                );
                start.push_attribute((attr.name.as_bytes(), value.as_bytes()));
            }

            let children = doc.children(id);
            if children.is_empty() {
                writer.write_event(Event::Empty(start)).map_err(write_error)?;
            } else {
                writer.write_event(Event::Start(start)).map_err(write_error)?;
                for &child in children {
                    write_node(doc, child, writer)?;
                }
                writer
                    .write_event(Event::End(BytesEnd::new(element.name.as_str())))
                    .map_err(write_error)?;
            }
        }
        NodeKind::Text(text) => {
            // Only markup characters are escaped so apostrophes and quotes in
            // labels survive unchanged.
            let escaped = partial_escape(text);
            writer.write_event(Event::Text(BytesText::from_escaped(escaped))).map_err(write_error)?;
        }
        NodeKind::EntityText { raw, .. } => {
            writer
                .write_event(Event::Text(BytesText::from_escaped(raw.as_str())))
                .map_err(write_error)?;
        }
        NodeKind::CData(text) => {
            writer.write_event(Event::CData(BytesCData::new(text.as_str()))).map_err(write_error)?;
        }
        NodeKind::Comment(text) => {
            writer
                .write_event(Event::Comment(BytesText::from_escaped(text.as_str())))
                .map_err(write_error)?;
        }
        NodeKind::ProcessingInstruction(text) => {
            writer.write_event(Event::PI(BytesPI::new(text.as_str()))).map_err(write_error)?;
        }
        NodeKind::DocType(text) => {
            writer
                .write_event(Event::DocType(BytesText::from_escaped(text.as_str())))
                .map_err(write_error)?;
        }
    }
    Ok(())
}
