//! In-memory document tree
//!
//! Elements and text nodes live in a slotmap arena keyed by [`NodeId`]. A fresh
//! document holds `html > (head, body)`; the `html` element doubles as the
//! scrolling element that stands in for the window.
//!
//! Layout is not computed here. Hosts (and tests) write [`LayoutMetrics`]
//! directly, and scrolling is clamped against them.

use html_escape::{encode_double_quoted_attribute, encode_text};
use indexmap::IndexMap;
use sel_core::EventDispatcher;
use slotmap::{new_key_type, Key, KeyData, SlotMap};

use crate::error::{DomError, Result};
use crate::style::property_name;

new_key_type! {
    /// Handle to a node in a [`Document`]
    pub struct NodeId;
}

impl NodeId {
    /// Integer form used as an event target
    pub fn to_raw(self) -> u64 {
        self.data().as_ffi()
    }

    pub fn from_raw(raw: u64) -> Self {
        KeyData::from_ffi(raw).into()
    }
}

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Box metrics of an element, in CSS pixels
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LayoutMetrics {
    /// Position relative to the document origin
    pub offset_left: f32,
    pub offset_top: f32,
    /// Visible size of the scroll port
    pub client_width: f32,
    pub client_height: f32,
    /// Size of the scrollable content
    pub scroll_width: f32,
    pub scroll_height: f32,
}

impl LayoutMetrics {
    pub fn max_scroll_left(&self) -> f32 {
        (self.scroll_width - self.client_width).max(0.0)
    }

    pub fn max_scroll_top(&self) -> f32 {
        (self.scroll_height - self.client_height).max(0.0)
    }
}

/// Element payload: tag, attributes, inline style, metrics and scroll offsets
#[derive(Clone, Debug)]
pub struct ElementData {
    tag: String,
    attributes: IndexMap<String, String>,
    style: IndexMap<String, String>,
    pub metrics: LayoutMetrics,
    scroll_left: f32,
    scroll_top: f32,
}

impl ElementData {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.trim().to_ascii_lowercase(),
            attributes: IndexMap::new(),
            style: IndexMap::new(),
            metrics: LayoutMetrics::default(),
            scroll_left: 0.0,
            scroll_top: 0.0,
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn id(&self) -> Option<&str> {
        self.attributes.get("id").map(String::as_str)
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attributes
            .get("class")
            .into_iter()
            .flat_map(|classes| classes.split_whitespace())
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }

    /// Attribute value. `style` is served from the inline declarations.
    pub fn attribute(&self, name: &str) -> Option<String> {
        let name = name.trim().to_ascii_lowercase();
        if name == "style" {
            return (!self.style.is_empty()).then(|| self.style_text());
        }
        self.attributes.get(&name).cloned()
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        let name = name.trim().to_ascii_lowercase();
        if name == "style" {
            return !self.style.is_empty();
        }
        self.attributes.contains_key(&name)
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn set_attribute(&mut self, name: &str, value: &str) {
        let name = name.trim().to_ascii_lowercase();
        if name == "style" {
            self.set_style_text(value);
        } else {
            self.attributes.insert(name, value.to_string());
        }
    }

    pub fn remove_attribute(&mut self, name: &str) -> bool {
        let name = name.trim().to_ascii_lowercase();
        if name == "style" {
            let had = !self.style.is_empty();
            self.style.clear();
            return had;
        }
        self.attributes.shift_remove(&name).is_some()
    }

    /// Inline style value for a property, in either camelCase or kebab-case
    pub fn style(&self, property: &str) -> Option<&str> {
        self.style.get(&property_name(property)).map(String::as_str)
    }

    pub fn styles(&self) -> impl Iterator<Item = (&str, &str)> {
        self.style.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn set_style(&mut self, property: &str, value: &str) {
        let property = property_name(property);
        if value.trim().is_empty() {
            self.style.shift_remove(&property);
        } else {
            self.style.insert(property, value.trim().to_string());
        }
    }

    pub fn remove_style(&mut self, property: &str) -> Option<String> {
        self.style.shift_remove(&property_name(property))
    }

    /// Serialize the inline declarations as a `style` attribute value
    pub fn style_text(&self) -> String {
        self.style
            .iter()
            .map(|(k, v)| format!("{}: {};", k, v))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Replace the inline declarations with those in `text`
    pub fn set_style_text(&mut self, text: &str) {
        self.style.clear();
        for declaration in text.split(';') {
            if let Some((property, value)) = declaration.split_once(':') {
                let property = property.trim();
                if !property.is_empty() {
                    self.set_style(property, value);
                }
            }
        }
    }

    pub fn scroll_left(&self) -> f32 {
        self.scroll_left
    }

    pub fn scroll_top(&self) -> f32 {
        self.scroll_top
    }

    /// Set scroll offsets, clamped to the scrollable range.
    ///
    /// Returns the offsets actually applied.
    pub fn set_scroll_position(&mut self, left: f32, top: f32) -> (f32, f32) {
        let clamp = |value: f32, max: f32| if value.is_finite() { value.clamp(0.0, max) } else { 0.0 };
        self.scroll_left = clamp(left, self.metrics.max_scroll_left());
        self.scroll_top = clamp(top, self.metrics.max_scroll_top());
        (self.scroll_left, self.scroll_top)
    }

    fn is_void(&self) -> bool {
        VOID_ELEMENTS.contains(&self.tag.as_str())
    }
}

#[derive(Clone, Debug)]
pub enum NodeKind {
    Element(ElementData),
    Text(String),
}

#[derive(Clone, Debug)]
pub struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn as_element(&self) -> Option<&ElementData> {
        match &self.kind {
            NodeKind::Element(element) => Some(element),
            NodeKind::Text(_) => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut ElementData> {
        match &mut self.kind {
            NodeKind::Element(element) => Some(element),
            NodeKind::Text(_) => None,
        }
    }
}

/// A document: node arena, listener registry and focus
pub struct Document {
    nodes: SlotMap<NodeId, Node>,
    root: NodeId,
    head: NodeId,
    body: NodeId,
    listeners: EventDispatcher,
    focused: Option<NodeId>,
    next_uid: u64,
}

impl Document {
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(Node::new(NodeKind::Element(ElementData::new("html"))));
        let head = nodes.insert(Node::new(NodeKind::Element(ElementData::new("head"))));
        let body = nodes.insert(Node::new(NodeKind::Element(ElementData::new("body"))));
        for child in [head, body] {
            nodes[child].parent = Some(root);
            nodes[root].children.push(child);
        }

        Self {
            nodes,
            root,
            head,
            body,
            listeners: EventDispatcher::new(),
            focused: None,
            next_uid: 0,
        }
    }

    /// The `html` element
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn head(&self) -> NodeId {
        self.head
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    /// The element scrolled when the window scrolls
    pub fn scrolling_element(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        self.nodes.get(id).and_then(Node::as_element)
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        self.nodes.get_mut(id).and_then(Node::as_element_mut)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Whether the node is attached under the root
    pub fn is_connected(&self, id: NodeId) -> bool {
        id == self.root || self.ancestors(id).last() == Some(&self.root)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Create a detached element
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.nodes
            .insert(Node::new(NodeKind::Element(ElementData::new(tag))))
    }

    /// Create a detached text node
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.nodes.insert(Node::new(NodeKind::Text(text.to_string())))
    }

    /// Create an element and append it to `parent`
    pub fn append_element(&mut self, parent: NodeId, tag: &str) -> Result<NodeId> {
        let child = self.create_element(tag);
        match self.append_child(parent, child) {
            Ok(()) => Ok(child),
            Err(err) => {
                self.nodes.remove(child);
                Err(err)
            }
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|node| node.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id).map_or(&[], |node| node.children())
    }

    /// Parent chain from the nearest ancestor outwards
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut ancestors = Vec::new();
        let mut current = self.parent(id);
        while let Some(node) = current {
            ancestors.push(node);
            current = self.parent(node);
        }
        ancestors
    }

    /// `id` and everything below it, in document order
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if !self.contains(id) {
            return out;
        }
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.insert_child(parent, child, None)
    }

    pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.insert_child(parent, child, Some(0))
    }

    fn insert_child(&mut self, parent: NodeId, child: NodeId, index: Option<usize>) -> Result<()> {
        if self.element(parent).is_none() || !self.contains(child) {
            return Err(DomError::StaleNode);
        }
        if child == self.root || child == parent || self.ancestors(parent).contains(&child) {
            return Err(DomError::HierarchyRequest);
        }

        self.detach(child);
        let children = &mut self.nodes[parent].children;
        match index {
            Some(index) => children.insert(index.min(children.len()), child),
            None => children.push(child),
        }
        self.nodes[child].parent = Some(parent);
        Ok(())
    }

    /// Unlink a node from its parent, keeping its subtree alive
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.parent(id) {
            self.nodes[parent].children.retain(|&c| c != id);
        }
        if let Some(node) = self.nodes.get_mut(id) {
            node.parent = None;
        }
    }

    /// Remove a node and its subtree; listeners registered on them go too.
    ///
    /// The root cannot be removed.
    pub fn remove(&mut self, id: NodeId) -> bool {
        if id == self.root || !self.contains(id) {
            return false;
        }
        self.detach(id);
        for node in self.descendants(id) {
            self.nodes.remove(node);
            self.listeners.clear_node(node.to_raw());
            if self.focused == Some(node) {
                self.focused = None;
            }
        }
        true
    }

    /// Remove every child of `id`
    pub fn clear_children(&mut self, id: NodeId) {
        for child in self.children(id).to_vec() {
            self.remove(child);
        }
    }

    /// Copy a node into a new detached node; listeners are not copied
    pub fn clone_node(&mut self, id: NodeId, deep: bool) -> Option<NodeId> {
        let kind = self.nodes.get(id)?.kind.clone();
        let copy = self.nodes.insert(Node::new(kind));
        if deep {
            for child in self.children(id).to_vec() {
                if let Some(child_copy) = self.clone_node(child, true) {
                    self.nodes[child_copy].parent = Some(copy);
                    self.nodes[copy].children.push(child_copy);
                }
            }
        }
        Some(copy)
    }

    /// Concatenated text of the node's subtree
    pub fn text_content(&self, id: NodeId) -> Option<String> {
        self.node(id)?;
        let text = self
            .descendants(id)
            .into_iter()
            .filter_map(|node| match &self.nodes[node].kind {
                NodeKind::Text(text) => Some(text.as_str()),
                NodeKind::Element(_) => None,
            })
            .collect();
        Some(text)
    }

    /// Replace the node's children with a single text node
    pub fn set_text_content(&mut self, id: NodeId, text: &str) {
        if let Some(NodeKind::Text(existing)) = self.nodes.get_mut(id).map(|node| &mut node.kind) {
            *existing = text.to_string();
            return;
        }
        if self.element(id).is_none() {
            return;
        }
        self.clear_children(id);
        if !text.is_empty() {
            let child = self.create_text(text);
            self.nodes[child].parent = Some(id);
            self.nodes[id].children.push(child);
        }
    }

    /// Markup of the node's children
    pub fn inner_html(&self, id: NodeId) -> Option<String> {
        self.node(id)?;
        let mut out = String::new();
        for &child in self.children(id) {
            self.write_node(child, &mut out);
        }
        Some(out)
    }

    /// Markup of the node itself
    pub fn outer_html(&self, id: NodeId) -> Option<String> {
        self.node(id)?;
        let mut out = String::new();
        self.write_node(id, &mut out);
        Some(out)
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        match &node.kind {
            NodeKind::Text(text) => out.push_str(&encode_text(text)),
            NodeKind::Element(element) => {
                out.push('<');
                out.push_str(&element.tag);
                for (name, value) in element.attributes() {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&encode_double_quoted_attribute(value));
                    out.push('"');
                }
                if !element.style.is_empty() {
                    out.push_str(" style=\"");
                    out.push_str(&encode_double_quoted_attribute(&element.style_text()));
                    out.push('"');
                }
                out.push('>');
                if element.is_void() {
                    return;
                }
                for &child in &node.children {
                    self.write_node(child, out);
                }
                out.push_str("</");
                out.push_str(&element.tag);
                out.push('>');
            }
        }
    }

    /// First connected element with the given id attribute
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .find(|&node| self.element(node).and_then(ElementData::id) == Some(id))
    }

    pub fn focused(&self) -> Option<NodeId> {
        self.focused
    }

    pub fn set_focused(&mut self, node: Option<NodeId>) {
        self.focused = node.filter(|&n| self.element(n).is_some());
    }

    pub fn listeners(&self) -> &EventDispatcher {
        &self.listeners
    }

    pub fn listeners_mut(&mut self) -> &mut EventDispatcher {
        &mut self.listeners
    }

    /// Document-unique number for generated ids
    pub fn next_uid(&mut self) -> u64 {
        self.next_uid += 1;
        self.next_uid
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("nodes", &self.nodes.len())
            .field("focused", &self.focused)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn list(doc: &mut Document) -> (NodeId, NodeId, NodeId) {
        let ul = doc.append_element(doc.body(), "ul").unwrap();
        let a = doc.append_element(ul, "li").unwrap();
        let b = doc.append_element(ul, "li").unwrap();
        (ul, a, b)
    }

    #[test]
    fn test_new_document_shape() {
        let doc = Document::new();
        assert_eq!(doc.children(doc.root()), &[doc.head(), doc.body()]);
        assert_eq!(doc.scrolling_element(), doc.root());
        assert!(doc.is_connected(doc.body()));
        assert_eq!(
            doc.outer_html(doc.root()).unwrap(),
            "<html><head></head><body></body></html>"
        );
    }

    #[test]
    fn test_attributes_and_style_serialize() {
        let mut doc = Document::new();
        let div = doc.append_element(doc.body(), "DIV").unwrap();
        let el = doc.element_mut(div).unwrap();
        el.set_attribute("id", "box");
        el.set_attribute("title", "a \"quoted\" title");
        el.set_style("backgroundColor", "red");
        el.set_style("width", "10px");

        assert_eq!(el.style("background-color"), Some("red"));
        assert_eq!(el.attribute("style").unwrap(), "background-color: red; width: 10px;");
        assert_eq!(
            doc.outer_html(div).unwrap(),
            "<div id=\"box\" title=\"a &quot;quoted&quot; title\" style=\"background-color: red; width: 10px;\"></div>"
        );
    }

    #[test]
    fn test_style_attribute_round_trip() {
        let mut el = ElementData::new("p");
        el.set_attribute("style", "color: blue; margin-top : 4px;;");
        assert_eq!(el.style("marginTop"), Some("4px"));
        assert!(el.remove_attribute("style"));
        assert_eq!(el.attribute("style"), None);
    }

    #[test]
    fn test_text_content_and_escaping() {
        let mut doc = Document::new();
        let p = doc.append_element(doc.body(), "p").unwrap();
        doc.set_text_content(p, "a < b & c");
        assert_eq!(doc.text_content(p).unwrap(), "a < b & c");
        assert_eq!(doc.inner_html(p).unwrap(), "a &lt; b &amp; c");

        doc.set_text_content(p, "");
        assert!(doc.children(p).is_empty());
    }

    #[test]
    fn test_void_elements_have_no_closing_tag() {
        let mut doc = Document::new();
        let input = doc.append_element(doc.body(), "input").unwrap();
        doc.element_mut(input).unwrap().set_attribute("value", "x");
        assert_eq!(doc.outer_html(input).unwrap(), "<input value=\"x\">");
    }

    #[test]
    fn test_prepend_moves_node() {
        let mut doc = Document::new();
        let (ul, a, b) = list(&mut doc);
        doc.prepend_child(ul, b).unwrap();
        assert_eq!(doc.children(ul), &[b, a]);
        assert_eq!(doc.parent(b), Some(ul));
    }

    #[test]
    fn test_insert_into_own_subtree_is_rejected() {
        let mut doc = Document::new();
        let (ul, a, _) = list(&mut doc);
        assert!(matches!(doc.append_child(a, ul), Err(DomError::HierarchyRequest)));
        assert!(matches!(doc.append_child(ul, ul), Err(DomError::HierarchyRequest)));
        let root = doc.root();
        assert!(matches!(doc.append_child(a, root), Err(DomError::HierarchyRequest)));
    }

    #[test]
    fn test_remove_drops_subtree_and_focus() {
        let mut doc = Document::new();
        let (ul, a, b) = list(&mut doc);
        doc.set_focused(Some(a));
        assert!(doc.remove(ul));
        assert!(!doc.contains(a) && !doc.contains(b));
        assert_eq!(doc.focused(), None);
        assert!(!doc.remove(doc.root()));
    }

    #[test]
    fn test_deep_clone_is_detached_copy() {
        let mut doc = Document::new();
        let (ul, _, _) = list(&mut doc);
        doc.element_mut(ul).unwrap().set_attribute("class", "menu");

        let shallow = doc.clone_node(ul, false).unwrap();
        assert!(doc.children(shallow).is_empty());

        let deep = doc.clone_node(ul, true).unwrap();
        assert_eq!(doc.parent(deep), None);
        assert!(!doc.is_connected(deep));
        assert_eq!(doc.children(deep).len(), 2);
        assert!(doc.element(deep).unwrap().has_class("menu"));
    }

    #[test]
    fn test_scroll_position_clamps() {
        let mut el = ElementData::new("div");
        el.metrics.client_height = 100.0;
        el.metrics.scroll_height = 400.0;
        assert_eq!(el.set_scroll_position(50.0, 1000.0), (0.0, 300.0));
        assert_eq!(el.set_scroll_position(0.0, -5.0), (0.0, 0.0));
    }

    #[test]
    fn test_get_element_by_id_and_raw_ids() {
        let mut doc = Document::new();
        let (_, a, _) = list(&mut doc);
        doc.element_mut(a).unwrap().set_attribute("id", "first");
        assert_eq!(doc.get_element_by_id("first"), Some(a));
        assert_eq!(NodeId::from_raw(a.to_raw()), a);
    }
}
