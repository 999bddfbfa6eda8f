use std::collections::HashSet;
use std::path::Path;

use super::XmlError;
use crate::error::Error;

/// Index of a node inside its [`Document`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// An attribute with its unescaped value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Qualified name as written in the source.
    pub name: String,
    /// Value with every resolvable reference replaced.
    pub value: String,
    /// Source markup of a value that used custom entities, written back as is
    /// until the value changes.
    pub(super) raw: Option<String>,
}

/// An element name with its attributes in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Qualified name as written in the source (`text`, `svg:text`, ...).
    pub name: String,
    /// Attributes in source order.
    pub attributes: Vec<Attribute>,
}

impl Element {
    /// Element without attributes.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), attributes: Vec::new() }
    }

    /// Name without its namespace prefix.
    #[must_use]
    pub fn local_name(&self) -> &str {
        self.name.rsplit_once(':').map_or(self.name.as_str(), |(_, local)| local)
    }

    /// Namespace prefix including the trailing colon, or an empty string.
    #[must_use]
    pub fn prefix(&self) -> &str {
        self.name
            .rsplit_once(':')
            .map_or("", |(prefix, _)| self.name.get(..=prefix.len()).unwrap_or_default())
    }

    /// Value of the attribute `name`.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.iter().find(|a| a.name == name).map(|a| a.value.as_str())
    }

    /// Sets an attribute, keeping its position when it already exists.
    pub fn set_attribute(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        if let Some(attr) = self.attributes.iter_mut().find(|a| a.name == name) {
            attr.value = value;
            attr.raw = None;
        } else {
            self.attributes.push(Attribute { name: name.to_string(), value, raw: None });
        }
    }

    /// Removes the attribute `name` and returns its value.
    pub fn remove_attribute(&mut self, name: &str) -> Option<String> {
        let index = self.attributes.iter().position(|a| a.name == name)?;
        Some(self.attributes.remove(index).value)
    }
}

/// Payload of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// The document node; parent of the root element and top-level comments.
    Root,
    /// An element.
    Element(Element),
    /// Character data, unescaped.
    Text(String),
    /// Text read from markup that uses custom entities. `text` has the known
    /// references resolved; `raw` is the source markup and is written back.
    EntityText { text: String, raw: String },
    /// A CDATA section.
    CData(String),
    /// A comment, without the delimiters.
    Comment(String),
    /// A processing instruction, without the delimiters.
    ProcessingInstruction(String),
    /// A doctype declaration, without `<!DOCTYPE` and `>`.
    DocType(String),
}

/// Arena slot of one node.
#[derive(Debug, Clone)]
struct NodeData {
    /// What the node is.
    kind: NodeKind,
    /// `None` for the document node and detached nodes.
    parent: Option<NodeId>,
    /// Children in document order.
    children: Vec<NodeId>,
}

/// XML declaration fields, kept so documents are written back the way they came in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Declaration {
    /// `version`, `1.0` when missing.
    pub(super) version: String,
    /// `encoding`, if declared.
    pub(super) encoding: Option<String>,
    /// `standalone`, if declared.
    pub(super) standalone: Option<String>,
}

/// An SVG document held as an arena of nodes with parent links.
///
/// Nodes are never freed: detaching a node only unlinks it from its parent, so
/// a [`NodeId`] stays valid for the lifetime of the document.
#[derive(Debug, Clone)]
pub struct Document {
    /// Every node ever created; index 0 is the document node.
    nodes: Vec<NodeData>,
    /// The XML declaration, if the source had one.
    pub(super) declaration: Option<Declaration>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Creates an empty document holding only the document node.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeData { kind: NodeKind::Root, parent: None, children: Vec::new() }],
            declaration: None,
        }
    }

    /// Parses SVG markup.
    ///
    /// # Errors
    /// Returns [`XmlError`] for malformed markup or a missing root element.
    pub fn parse(xml: &str) -> Result<Self, XmlError> {
        super::parse::parse_document(xml)
    }

    /// Reads and parses an SVG file.
    ///
    /// # Errors
    /// Returns [`Error::Io`] when the file cannot be read and [`Error::Xml`] when
    /// it is not well-formed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|source| Error::Io { path: path.to_path_buf(), source })?;
        Ok(Self::parse(&content)?)
    }

    /// Serializes the document.
    ///
    /// # Errors
    /// Returns [`XmlError::Write`] if the writer fails.
    pub fn to_xml_string(&self) -> Result<String, XmlError> {
        super::write::write_document(self)
    }

    /// Serializes the document to `path`, creating parent directories.
    ///
    /// # Errors
    /// Returns [`Error::Io`] or [`Error::Xml`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let path = path.as_ref();
        let xml = self.to_xml_string()?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .map_err(|source| Error::Io { path: parent.to_path_buf(), source })?;
        }
        std::fs::write(path, xml).map_err(|source| Error::Io { path: path.to_path_buf(), source })
    }

    /// The document node.
    #[must_use]
    pub const fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// The outermost element (`<svg>`), if the document has one.
    #[must_use]
    pub fn root_element(&self) -> Option<NodeId> {
        self.children(self.root()).iter().copied().find(|&id| self.element(id).is_some())
    }

    /// Slot of `id`.
    #[allow(clippy::indexing_slicing)] // NodeIds come from `push` and slots are never removed
    fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0]
    }

    /// Mutable slot of `id`.
    #[allow(clippy::indexing_slicing)] // NodeIds come from `push` and slots are never removed
    fn node_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.0]
    }

    /// Payload of `id`.
    #[must_use]
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.node(id).kind
    }

    /// The element at `id`, if it is one.
    #[must_use]
    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.node(id).kind {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    /// Mutable access to the element at `id`, if it is one.
    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.node_mut(id).kind {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    /// Text of a text or CDATA node.
    #[must_use]
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Text(text)
            | NodeKind::CData(text)
            | NodeKind::EntityText { text, .. } => Some(text),
            _ => None,
        }
    }

    /// Parent of `id`; `None` for the document node and detached nodes.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Children of `id` in document order.
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    /// Element children of `id`, in order.
    #[must_use]
    pub fn child_elements(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id).iter().copied().filter(|&c| self.element(c).is_some()).collect()
    }

    /// Local name of the element at `id`.
    #[must_use]
    pub fn local_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(Element::local_name)
    }

    /// Returns true if `id` is an element with the given local name.
    #[must_use]
    pub fn is_element(&self, id: NodeId, local_name: &str) -> bool {
        self.local_name(id) == Some(local_name)
    }

    /// Attribute `name` of the element at `id`.
    #[must_use]
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|e| e.attribute(name))
    }

    /// Sets an attribute on an element node; other node kinds are left alone.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        if let Some(element) = self.element_mut(id) {
            element.set_attribute(name, value);
        }
    }

    /// Removes attribute `name` from the element at `id` and returns its value.
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Option<String> {
        self.element_mut(id).and_then(|e| e.remove_attribute(name))
    }

    /// All descendants of `id` in document order, excluding `id` itself.
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            result.push(next);
            stack.extend(self.children(next).iter().rev());
        }
        result
    }

    /// Attached elements with the given local name, in document order.
    #[must_use]
    pub fn elements_by_name(&self, local_name: &str) -> Vec<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .filter(|&id| self.is_element(id, local_name))
            .collect()
    }

    /// Returns true if `id` is reachable from the document node.
    #[must_use]
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == self.root() {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// Position of `id` among its parent's children.
    #[must_use]
    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    /// Adds a detached node.
    fn push(&mut self, kind: NodeKind) -> NodeId {
        self.nodes.push(NodeData { kind, parent: None, children: Vec::new() });
        NodeId(self.nodes.len() - 1)
    }

    /// Creates a detached element.
    pub fn create_element(&mut self, name: impl Into<String>) -> NodeId {
        self.push(NodeKind::Element(Element::new(name)))
    }

    /// Creates a detached text node.
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeKind::Text(text.into()))
    }

    /// Creates a detached node of any kind.
    pub(super) fn create_node(&mut self, kind: NodeKind) -> NodeId {
        self.push(kind)
    }

    /// Returns true if `candidate` is `of` or one of its ancestors.
    fn is_ancestor_or_self(&self, candidate: NodeId, of: NodeId) -> bool {
        let mut current = Some(of);
        while let Some(node) = current {
            if node == candidate {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// Unlinks `id` from its parent. The subtree below `id` stays intact.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.node_mut(id).parent.take() {
            self.node_mut(parent).children.retain(|&c| c != id);
        }
    }

    /// Moves `child` to position `index` among the children of `parent`.
    ///
    /// `index` is clamped to the number of children. Inserting a node below
    /// itself is ignored.
    pub fn insert_at(&mut self, parent: NodeId, index: usize, child: NodeId) {
        if self.is_ancestor_or_self(child, parent) {
            tracing::warn!(?child, ?parent, "Refusing to insert a node below itself");
            return;
        }
        self.detach(child);
        let children = &mut self.node_mut(parent).children;
        let index = index.min(children.len());
        children.insert(index, child);
        self.node_mut(child).parent = Some(parent);
    }

    /// Moves `child` to the end of the children of `parent`.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        let index = self.children(parent).len();
        self.insert_at(parent, index, child);
    }

    /// Inserts `child` as the previous sibling of `reference`.
    pub fn insert_before(&mut self, reference: NodeId, child: NodeId) {
        let Some(parent) = self.parent(reference) else {
            return;
        };
        self.detach(child);
        if let Some(index) = self.index_in_parent(reference) {
            self.insert_at(parent, index, child);
        }
    }

    /// Inserts `child` as the next sibling of `reference`.
    pub fn insert_after(&mut self, reference: NodeId, child: NodeId) {
        let Some(parent) = self.parent(reference) else {
            return;
        };
        self.detach(child);
        if let Some(index) = self.index_in_parent(reference) {
            self.insert_at(parent, index + 1, child);
        }
    }

    /// Deep-copies the subtree rooted at `id` into a new detached subtree.
    pub fn deep_clone(&mut self, id: NodeId) -> NodeId {
        let copy = self.push(self.node(id).kind.clone());
        let children = self.node(id).children.clone();
        for child in children {
            let child_copy = self.deep_clone(child);
            self.node_mut(child_copy).parent = Some(copy);
            self.node_mut(copy).children.push(child_copy);
        }
        copy
    }

    /// Concatenated text of all descendants, like DOM `textContent`.
    #[must_use]
    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(text) = self.text(id) {
            return text.to_string();
        }
        self.descendants(id).into_iter().filter_map(|d| self.text(d)).collect()
    }

    /// Replaces every child of `id` with a single text node.
    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        for child in self.children(id).to_vec() {
            self.detach(child);
        }
        let text = self.create_text(text);
        self.append_child(id, text);
    }

    /// Every `id` attribute value in the attached tree.
    #[must_use]
    pub fn ids_in_use(&self) -> HashSet<String> {
        self.descendants(self.root())
            .into_iter()
            .filter_map(|node| self.attribute(node, "id"))
            .map(str::to_string)
            .collect()
    }
}
