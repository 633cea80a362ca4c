//! Chainable handle over selected elements
//!
//! Mutators apply to every element still present and return `&Self` (or
//! `Result<&Self>` when they can fail). On an empty selection they do nothing.
//! Getters read the first element and return `None` when there is none.

use smallvec::SmallVec;

use sel_core::events::event_types;
use sel_core::{EventData, EventType, Listener};

use crate::document::{Document, NodeId};
use crate::error::{DomError, Result};
use crate::page::Page;
use crate::style::{custom_property_name, parse_leading_number, CssProperties};

/// Elements picked out of a [`Page`]
#[derive(Clone)]
pub struct Selection {
    page: Page,
    nodes: SmallVec<[NodeId; 4]>,
}

impl Selection {
    pub(crate) fn new(page: Page, nodes: SmallVec<[NodeId; 4]>) -> Self {
        Self { page, nodes }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn first(&self) -> Option<NodeId> {
        self.nodes.first().copied()
    }

    /// Selected elements that still exist
    pub(crate) fn live(&self, doc: &Document, op: &str) -> SmallVec<[NodeId; 4]> {
        let live: SmallVec<[NodeId; 4]> = self
            .nodes
            .iter()
            .copied()
            .filter(|&node| doc.element(node).is_some())
            .collect();
        if live.is_empty() {
            tracing::trace!("{}: no elements selected", op);
        }
        live
    }

    fn first_live(&self, doc: &Document) -> Option<NodeId> {
        self.nodes
            .iter()
            .copied()
            .find(|&node| doc.element(node).is_some())
    }

    fn each(&self, op: &str, mut apply: impl FnMut(&mut Document, NodeId)) -> &Self {
        let mut doc = self.page.document();
        for node in self.live(&doc, op) {
            apply(&mut *doc, node);
        }
        self
    }

    /// Text content of the first element
    pub fn text(&self) -> Option<String> {
        let doc = self.page.document();
        self.first_live(&doc).and_then(|node| doc.text_content(node))
    }

    /// Text content of every element
    pub fn texts(&self) -> Vec<String> {
        let doc = self.page.document();
        self.live(&doc, "texts")
            .into_iter()
            .filter_map(|node| doc.text_content(node))
            .collect()
    }

    pub fn set_text(&self, text: &str) -> &Self {
        self.each("set_text", |doc, node| doc.set_text_content(node, text))
    }

    /// Inner markup of the first element
    pub fn html(&self) -> Option<String> {
        let doc = self.page.document();
        self.first_live(&doc).and_then(|node| doc.inner_html(node))
    }

    /// Markup of the first element itself
    pub fn outer_html(&self) -> Option<String> {
        let doc = self.page.document();
        self.first_live(&doc).and_then(|node| doc.outer_html(node))
    }

    /// Set inline style declarations
    pub fn css(&self, properties: &CssProperties) -> &Self {
        self.each("css", |doc, node| {
            if let Some(element) = doc.element_mut(node) {
                for (property, value) in properties.iter() {
                    element.set_style(property, value);
                }
            }
        })
    }

    pub fn remove_css<'p>(&self, properties: impl IntoIterator<Item = &'p str>) -> &Self {
        let properties: Vec<&str> = properties.into_iter().collect();
        self.each("remove_css", |doc, node| {
            if let Some(element) = doc.element_mut(node) {
                for property in &properties {
                    element.remove_style(property);
                }
            }
        })
    }

    /// Append `node` to the first element; later elements receive deep clones
    pub fn append(&self, node: NodeId) -> Result<&Self> {
        self.insert(node, false)
    }

    /// Prepend `node` to the first element; later elements receive deep clones
    pub fn prepend(&self, node: NodeId) -> Result<&Self> {
        self.insert(node, true)
    }

    fn insert(&self, node: NodeId, at_start: bool) -> Result<&Self> {
        let mut doc = self.page.document();
        let targets = self.live(&doc, if at_start { "prepend" } else { "append" });
        if targets.is_empty() {
            return Ok(self);
        }
        if !doc.contains(node) {
            return Err(DomError::StaleNode);
        }
        if targets
            .iter()
            .any(|&target| target == node || doc.ancestors(target).contains(&node))
        {
            return Err(DomError::HierarchyRequest);
        }

        let copies: Vec<NodeId> = (1..targets.len())
            .filter_map(|_| doc.clone_node(node, true))
            .collect();
        for (&target, child) in targets.iter().zip(std::iter::once(node).chain(copies)) {
            if at_start {
                doc.prepend_child(target, child)?;
            } else {
                doc.append_child(target, child)?;
            }
        }
        Ok(self)
    }

    /// Detached copy of the first element
    pub fn clone_node(&self, deep: bool) -> Option<NodeId> {
        let mut doc = self.page.document();
        let first = self.first_live(&doc)?;
        doc.clone_node(first, deep)
    }

    pub fn attr(&self, name: &str) -> Option<String> {
        let doc = self.page.document();
        self.first_live(&doc)
            .and_then(|node| doc.element(node))
            .and_then(|element| element.attribute(name))
    }

    pub fn set_attr(&self, name: &str, value: &str) -> &Self {
        self.each("set_attr", |doc, node| {
            if let Some(element) = doc.element_mut(node) {
                element.set_attribute(name, value);
            }
        })
    }

    pub fn remove_attr<'n>(&self, names: impl IntoIterator<Item = &'n str>) -> &Self {
        let names: Vec<&str> = names.into_iter().collect();
        self.each("remove_attr", |doc, node| {
            if let Some(element) = doc.element_mut(node) {
                for name in &names {
                    element.remove_attribute(name);
                }
            }
        })
    }

    /// Form value of the first element
    pub fn val(&self) -> Option<String> {
        self.attr("value")
    }

    pub fn set_val(&self, value: &str) -> &Self {
        self.set_attr("value", value)
    }

    /// Register `listener` for `event` on every element
    pub fn on(&self, event: &str, listener: &Listener) -> Result<&Self> {
        let event_type = EventType::new(event)?;
        Ok(self.each("on", |doc, node| {
            doc.listeners_mut()
                .register(node.to_raw(), event_type.clone(), listener.clone());
        }))
    }

    /// Remove a listener previously registered with [`on`](Self::on)
    pub fn off(&self, event: &str, listener: &Listener) -> Result<&Self> {
        let event_type = EventType::new(event)?;
        Ok(self.each("off", |doc, node| {
            doc.listeners_mut()
                .unregister(node.to_raw(), &event_type, listener);
        }))
    }

    /// Fire a bubbling event at every element
    pub fn trigger(&self, event: &str) -> Result<&Self> {
        self.trigger_with(event, EventData::None)
    }

    pub fn trigger_with(&self, event: &str, data: EventData) -> Result<&Self> {
        let event_type = EventType::new(event)?;
        let targets = self.live(&self.page.document(), "trigger");
        for node in targets {
            self.page.dispatch(node, &event_type, data.clone(), true);
        }
        Ok(self)
    }

    /// Remove every element from the document
    pub fn remove(&self) -> &Self {
        {
            let mut doc = self.page.document();
            for node in self.live(&doc, "remove") {
                doc.remove(node);
            }
        }
        self
    }

    /// Focus the first element; the previously focused one receives `blur`
    pub fn focus(&self) -> &Self {
        let (previous, next) = {
            let mut doc = self.page.document();
            let Some(next) = self.first_live(&doc) else {
                tracing::trace!("focus: no elements selected");
                return self;
            };
            let previous = doc.focused();
            if previous == Some(next) {
                return self;
            }
            doc.set_focused(Some(next));
            (previous, next)
        };

        if let Some(previous) = previous {
            self.fire(previous, event_types::BLUR);
        }
        self.fire(next, event_types::FOCUS);
        self
    }

    /// Drop focus if one of the elements holds it
    pub fn blur(&self) -> &Self {
        let blurred = {
            let mut doc = self.page.document();
            match doc.focused() {
                Some(focused) if self.nodes.contains(&focused) => {
                    doc.set_focused(None);
                    Some(focused)
                }
                _ => None,
            }
        };
        if let Some(node) = blurred {
            self.fire(node, event_types::BLUR);
        }
        self
    }

    fn fire(&self, node: NodeId, name: &str) {
        if let Ok(event_type) = EventType::new(name) {
            self.page.dispatch(node, &event_type, EventData::None, false);
        }
    }

    /// Inline style value of the first element
    pub fn get_style(&self, property: &str) -> Option<String> {
        let doc = self.page.document();
        self.first_live(&doc)
            .and_then(|node| doc.element(node))
            .and_then(|element| element.style(property))
            .map(str::to_string)
    }

    /// Leading number of [`get_style`](Self::get_style) (`"12px"` → `12.0`)
    pub fn get_style_number(&self, property: &str) -> Option<f32> {
        self.get_style(property)
            .as_deref()
            .and_then(parse_leading_number)
    }

    /// Custom property, looked up on the first element then its ancestors
    pub fn get_css_var(&self, name: &str) -> Option<String> {
        let name = custom_property_name(name);
        let doc = self.page.document();
        let first = self.first_live(&doc)?;
        std::iter::once(first)
            .chain(doc.ancestors(first))
            .find_map(|node| doc.element(node).and_then(|element| element.style(&name)))
            .map(str::to_string)
    }

    pub fn get_css_var_number(&self, name: &str) -> Option<f32> {
        self.get_css_var(name)
            .as_deref()
            .and_then(parse_leading_number)
    }

    pub fn set_css_var(&self, name: &str, value: &str) -> &Self {
        let name = custom_property_name(name);
        self.each("set_css_var", |doc, node| {
            if let Some(element) = doc.element_mut(node) {
                element.set_style(&name, value);
            }
        })
    }
}

impl std::fmt::Debug for Selection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Selection").field("nodes", &self.nodes).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn page_with_list() -> Page {
        let (page, _) = Page::headless();
        {
            let mut doc = page.document();
            let body = doc.body();
            let ul = doc.append_element(body, "ul").unwrap();
            for i in 0..3 {
                let li = doc.append_element(ul, "li").unwrap();
                doc.element_mut(li).unwrap().set_attribute("class", "item");
                doc.set_text_content(li, &format!("item {}", i));
            }
        }
        page
    }

    #[test]
    fn test_text_and_html() {
        let page = page_with_list();
        let items = page.select(".item").unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items.text().as_deref(), Some("item 0"));
        assert_eq!(items.texts(), vec!["item 0", "item 1", "item 2"]);

        items.set_text("x");
        assert_eq!(
            page.select("ul").unwrap().html().unwrap(),
            "<li class=\"item\">x</li><li class=\"item\">x</li><li class=\"item\">x</li>"
        );
    }

    #[test]
    fn test_empty_selection_is_noop() {
        let page = page_with_list();
        let before = page.select("body").unwrap().html();
        let none = page.select(".missing").unwrap();
        none.set_text("x")
            .set_attr("a", "b")
            .css(&CssProperties::from([("color", "red")]))
            .focus()
            .blur();
        none.remove();
        assert_eq!(none.text(), None);
        assert_eq!(none.attr("a"), None);
        assert_eq!(none.get_style("color"), None);
        let body = page.document().body();
        assert!(none.append(body).is_ok());
        assert_eq!(page.select("body").unwrap().html(), before);
    }

    #[test]
    fn test_css_and_styles() {
        let page = page_with_list();
        let items = page.select("li").unwrap();
        items.css(&CssProperties::new().with("marginTop", "12.5px").with("color", "red"));
        assert_eq!(items.get_style("margin-top").as_deref(), Some("12.5px"));
        assert_eq!(items.get_style_number("marginTop"), Some(12.5));
        assert_eq!(items.attr("style").as_deref(), Some("margin-top: 12.5px; color: red;"));

        items.remove_css(["color"]);
        assert_eq!(items.get_style("color"), None);
    }

    #[test]
    fn test_attributes_and_values() {
        let page = page_with_list();
        let first = page.select("li").unwrap();
        first.set_attr("data-x", "1").set_val("hello");
        assert_eq!(first.attr("data-x").as_deref(), Some("1"));
        assert_eq!(first.val().as_deref(), Some("hello"));
        first.remove_attr(["data-x", "value"]);
        assert_eq!(first.attr("data-x"), None);
        assert_eq!(first.val(), None);
    }

    #[test]
    fn test_append_clones_for_extra_targets() {
        let page = page_with_list();
        let badge = {
            let mut doc = page.document();
            let badge = doc.create_element("b");
            doc.set_text_content(badge, "!");
            badge
        };
        let items = page.select("li").unwrap();
        items.append(badge).unwrap();
        assert_eq!(page.select("li > b").unwrap().len(), 3);
        assert_eq!(items.html().as_deref(), Some("item 0<b>!</b>"));

        let star = page.document().create_element("i");
        items.prepend(star).unwrap();
        assert_eq!(items.html().as_deref(), Some("<i></i>item 0<b>!</b>"));

        let list = page.select("ul").unwrap();
        let li = items.first().unwrap();
        assert!(matches!(
            page.select(li).unwrap().append(list.first().unwrap()),
            Err(DomError::HierarchyRequest)
        ));
    }

    #[test]
    fn test_clone_and_remove() {
        let page = page_with_list();
        let copy = page.select("ul").unwrap().clone_node(true).unwrap();
        assert!(!page.document().is_connected(copy));
        page.select("body").unwrap().append(copy).unwrap();
        assert_eq!(page.select("li").unwrap().len(), 6);

        let removed = page.select("ul").unwrap();
        assert_eq!(removed.remove().text(), None);
        assert!(page.select("li").unwrap().is_empty());
        // chaining on removed elements stays a no-op
        removed.remove().set_text("gone");
        assert!(page.select("ul").unwrap().is_empty());
    }

    #[test]
    fn test_on_off_trigger() {
        let page = page_with_list();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let listener = Listener::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let items = page.select("li").unwrap();
        items.on("click", &listener).unwrap();
        items.trigger("click").unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 3);

        items.off("click", &listener).unwrap();
        items.trigger("click").unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 3);

        assert!(matches!(items.on("not valid", &listener), Err(DomError::Event(_))));
    }

    #[test]
    fn test_trigger_bubbles_to_parent() {
        let page = page_with_list();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let listener = Listener::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        page.select("ul").unwrap().on("ping", &listener).unwrap();
        page.select("li").unwrap().trigger("ping").unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_focus_and_blur() {
        let page = page_with_list();
        let log = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = log.clone();
        let listener = Listener::new(move |event| {
            sink.lock().push(event.event_type.as_str().to_string());
        });
        let items = page.select("li").unwrap();
        items.on("focus", &listener).unwrap().on("blur", &listener).unwrap();

        let nodes = items.nodes().to_vec();
        page.select(nodes[0]).unwrap().focus();
        assert_eq!(page.document().focused(), Some(nodes[0]));
        page.select(nodes[1]).unwrap().focus();
        assert_eq!(page.document().focused(), Some(nodes[1]));

        page.select(nodes[0]).unwrap().blur();
        assert_eq!(page.document().focused(), Some(nodes[1]));
        items.blur();
        assert_eq!(page.document().focused(), None);
        assert_eq!(*log.lock(), vec!["focus", "blur", "focus", "blur"]);
    }

    #[test]
    fn test_css_vars_inherit_from_ancestors() {
        let page = page_with_list();
        page.root().set_css_var("gap", "8px");
        assert_eq!(page.root().get_css_var("--gap").as_deref(), Some("8px"));
        let items = page.select("li").unwrap();
        assert_eq!(items.get_css_var_number("gap"), Some(8.0));

        items.set_css_var("--gap", "2px");
        assert_eq!(items.get_css_var("gap").as_deref(), Some("2px"));
        assert_eq!(page.root().get_css_var("gap").as_deref(), Some("8px"));
    }
}
