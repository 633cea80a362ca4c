//! `pan`: drag-to-scroll on a container
//!
//! Each element gets pointer listeners sharing one drag state. While the
//! primary button is held, the element scrolls against the pointer's travel
//! since the press, clamped to its scroll range.

use std::sync::Arc;

use parking_lot::Mutex;

use sel_core::events::event_types;
use sel_core::{EventData, EventType, Listener};

use crate::document::NodeId;
use crate::error::Result;
use crate::page::WeakPage;
use crate::selection::Selection;

/// Pointer and scroll position when the drag began
#[derive(Clone, Copy, Debug, PartialEq)]
struct DragStart {
    pointer: (f32, f32),
    scroll: (f32, f32),
}

type DragState = Arc<Mutex<Option<DragStart>>>;

fn press_listener(page: WeakPage, node: NodeId, drag: DragState) -> Listener {
    Listener::new(move |event| {
        let (x, y) = match event.data {
            EventData::Pointer { x, y, button: 0 } => (x, y),
            _ => return,
        };
        let Some(page) = page.upgrade() else {
            return;
        };
        let mut doc = page.document();
        let Some(element) = doc.element_mut(node) else {
            return;
        };
        *drag.lock() = Some(DragStart {
            pointer: (x, y),
            scroll: (element.scroll_left(), element.scroll_top()),
        });
        element.set_style("cursor", "grabbing");
    })
}

fn move_listener(page: WeakPage, node: NodeId, drag: DragState, scroll: EventType) -> Listener {
    Listener::new(move |event| {
        let (x, y) = match event.data {
            EventData::Pointer { x, y, .. } => (x, y),
            _ => return,
        };
        let Some(start) = *drag.lock() else {
            return;
        };
        let Some(page) = page.upgrade() else {
            return;
        };

        let moved = {
            let mut doc = page.document();
            let Some(element) = doc.element_mut(node) else {
                return;
            };
            let before = (element.scroll_left(), element.scroll_top());
            let after = element.set_scroll_position(
                start.scroll.0 - (x - start.pointer.0),
                start.scroll.1 - (y - start.pointer.1),
            );
            (after != before).then_some(after)
        };
        if let Some((left, top)) = moved {
            page.dispatch(node, &scroll, EventData::Scroll { left, top }, false);
        }
    })
}

fn release_listener(page: WeakPage, node: NodeId, drag: DragState) -> Listener {
    Listener::new(move |_| {
        if drag.lock().take().is_none() {
            return;
        }
        if let Some(page) = page.upgrade() {
            if let Some(element) = page.document().element_mut(node) {
                element.set_style("cursor", "grab");
            }
        }
    })
}

impl Selection {
    /// Let the pointer drag every selected element's content around.
    ///
    /// Only the primary button starts a drag; `pointerup` or `pointercancel`
    /// ends it. Each move that changes the scroll position fires a
    /// non-bubbling `scroll` event at the element. The inline `cursor` shows
    /// `grab`, or `grabbing` mid-drag.
    pub fn pan(&self) -> Result<&Self> {
        let press = EventType::new(event_types::POINTER_DOWN)?;
        let motion = EventType::new(event_types::POINTER_MOVE)?;
        let release = EventType::new(event_types::POINTER_UP)?;
        let cancel = EventType::new(event_types::POINTER_CANCEL)?;
        let scroll = EventType::new(event_types::SCROLL)?;

        let mut doc = self.page().document();
        let nodes = self.live(&doc, "pan");
        for &node in &nodes {
            let drag = DragState::default();
            let page = self.page().downgrade();
            let end = release_listener(page.clone(), node, drag.clone());
            let handlers = [
                (press.clone(), press_listener(page.clone(), node, drag.clone())),
                (motion.clone(), move_listener(page, node, drag, scroll.clone())),
                (release.clone(), end.clone()),
                (cancel.clone(), end),
            ];
            for (event_type, listener) in handlers {
                doc.listeners_mut().register(node.to_raw(), event_type, listener);
            }
            if let Some(element) = doc.element_mut(node) {
                element.set_style("cursor", "grab");
                element.set_style("touch-action", "none");
            }
        }
        tracing::debug!("pan: enabled on {} element(s)", nodes.len());
        Ok(self)
    }
}
