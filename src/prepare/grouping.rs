use std::collections::HashMap;

use super::GroupingPolicy;
use crate::svg::{
    Document,
    NodeId,
};

/// Wraps `text` in a new `switch` at its current position.
fn wrap_in_switch(doc: &mut Document, text: NodeId) -> NodeId {
    let prefix = doc.element(text).map(|e| e.prefix().to_string()).unwrap_or_default();
    let switch = doc.create_element(format!("{prefix}switch"));
    doc.insert_before(text, switch);
    doc.append_child(switch, text);
    switch
}

/// Puts every `text` that is not already inside a `switch` into one.
///
/// Returns the number of switches created.
pub(super) fn group_loose_texts(doc: &mut Document, policy: GroupingPolicy) -> usize {
    let loose: Vec<NodeId> = doc
        .elements_by_name("text")
        .into_iter()
        .filter(|&t| !doc.parent(t).is_some_and(|p| doc.is_element(p, "switch")))
        .collect();

    let mut created = 0;
    let mut remaining = loose;

    if policy == GroupingPolicy::IdPrefix {
        let mut by_base: HashMap<(NodeId, String), NodeId> = HashMap::new();
        let mut variants = Vec::new();

        for text in remaining.drain(..) {
            let parent = doc.parent(text);
            let id = doc.attribute(text, "id").map(str::to_string);
            match (parent, id, doc.attribute(text, "systemLanguage").is_some()) {
                (Some(parent), Some(id), false) => {
                    let switch = wrap_in_switch(doc, text);
                    by_base.insert((parent, id), switch);
                    created += 1;
                }
                _ => variants.push(text),
            }
        }

        for text in variants {
            let target = doc.parent(text).zip(doc.attribute(text, "id")).and_then(|(parent, id)| {
                id.rmatch_indices('-')
                    .find_map(|(index, _)| by_base.get(&(parent, id.get(..index)?.to_string())))
                    .copied()
            });
            match target {
                Some(switch) if doc.attribute(text, "systemLanguage").is_some() => {
                    doc.append_child(switch, text);
                }
                _ => remaining.push(text),
            }
        }
    }

    for text in remaining {
        wrap_in_switch(doc, text);
        created += 1;
    }

    tracing::debug!(created, ?policy, "Grouped loose texts");
    created
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use googletest::prelude::*;
    use rstest::rstest;

    use super::*;

    const SIBLINGS: &str = r#"<svg><g><text id="title">Title</text><text id="title-fr" systemLanguage="fr">Titre</text><text id="other-de" systemLanguage="de">Andere</text></g></svg>"#;

    #[rstest]
    fn test_standalone_gives_each_text_a_switch() {
        let mut doc = Document::parse(SIBLINGS).unwrap();
        let created = group_loose_texts(&mut doc, GroupingPolicy::Standalone);

        assert_that!(created, eq(3));
        assert_that!(doc.elements_by_name("switch"), len(eq(3)));
    }

    #[rstest]
    fn test_id_prefix_joins_variant_with_its_default() {
        let mut doc = Document::parse(SIBLINGS).unwrap();
        let created = group_loose_texts(&mut doc, GroupingPolicy::IdPrefix);

        assert_that!(created, eq(2));
        let switches = doc.elements_by_name("switch");
        let first: Vec<&str> = doc
            .child_elements(switches[0])
            .into_iter()
            .filter_map(|t| doc.attribute(t, "id"))
            .collect();
        assert_eq!(first, vec!["title", "title-fr"]);
        assert_that!(doc.child_elements(switches[1]), len(eq(1)));
    }

    #[rstest]
    fn test_texts_inside_switch_are_left_alone() {
        let mut doc = Document::parse("<svg><switch><text>A</text></switch></svg>").unwrap();

        assert_that!(group_loose_texts(&mut doc, GroupingPolicy::Standalone), eq(0));
    }

    #[rstest]
    fn test_switch_keeps_namespace_prefix() {
        let mut doc =
            Document::parse(r#"<svg:svg xmlns:svg="http://www.w3.org/2000/svg"><svg:text>A</svg:text></svg:svg>"#)
                .unwrap();
        group_loose_texts(&mut doc, GroupingPolicy::Standalone);

        let switch = doc.elements_by_name("switch")[0];
        assert_eq!(doc.element(switch).map(|e| e.name.as_str()), Some("svg:switch"));
    }
}
