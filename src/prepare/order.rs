use super::switch_texts;
use crate::svg::{
    Document,
    NodeId,
};

/// Stable-sorts the `text` children of `switch` so language variants come
/// first and the default text is last.
///
/// Only the slots occupied by `text` elements are permuted; whitespace and
/// comments between them stay where they are.
pub fn sort_switch_texts(doc: &mut Document, switch: NodeId) {
    let texts = switch_texts(doc, switch);
    let (mut ordered, defaults): (Vec<NodeId>, Vec<NodeId>) =
        texts.iter().partition(|&&t| doc.attribute(t, "systemLanguage").is_some());
    ordered.extend(defaults);
    if ordered == texts {
        return;
    }

    let mut replacements = ordered.into_iter();
    let children: Vec<NodeId> = doc
        .children(switch)
        .iter()
        .map(|&child| {
            if doc.is_element(child, "text") { replacements.next().unwrap_or(child) } else { child }
        })
        .collect();

    for &child in &children {
        doc.detach(child);
    }
    for child in children {
        doc.append_child(switch, child);
    }
}

/// Applies [`sort_switch_texts`] to every switch in the document.
pub fn reorder_texts(doc: &mut Document) {
    for switch in doc.elements_by_name("switch") {
        sort_switch_texts(doc, switch);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn order(doc: &Document) -> Vec<String> {
        let switch = doc.elements_by_name("switch")[0];
        switch_texts(doc, switch)
            .into_iter()
            .map(|t| doc.attribute(t, "systemLanguage").unwrap_or("default").to_string())
            .collect()
    }

    #[rstest]
    fn test_sort_moves_default_last_and_keeps_variant_order() {
        let mut doc = Document::parse(
            r#"<svg><switch><text>D</text><text systemLanguage="fr">F</text><text systemLanguage="ar">A</text></switch></svg>"#,
        )
        .unwrap();
        reorder_texts(&mut doc);

        assert_eq!(order(&doc), vec!["fr", "ar", "default"]);
    }

    #[rstest]
    fn test_sort_keeps_whitespace_slots() {
        let xml = "<svg><switch>\n  <text>D</text>\n  <text systemLanguage=\"fr\">F</text>\n</switch></svg>";
        let mut doc = Document::parse(xml).unwrap();
        reorder_texts(&mut doc);

        assert_eq!(
            doc.to_xml_string().unwrap(),
            "<svg><switch>\n  <text systemLanguage=\"fr\">F</text>\n  <text>D</text>\n</switch></svg>"
        );
    }

    #[rstest]
    fn test_sort_is_idempotent() {
        let mut doc = Document::parse(
            r#"<svg><switch><text systemLanguage="de">G</text><text>D</text></switch></svg>"#,
        )
        .unwrap();
        let before = doc.to_xml_string().unwrap();
        reorder_texts(&mut doc);
        reorder_texts(&mut doc);

        assert_eq!(doc.to_xml_string().unwrap(), before);
    }
}
