//! Page: a document paired with the scheduler that animates it
//!
//! The document sits behind an `Arc<Mutex<_>>` shared with every selection and
//! every run callback. The lock is only held for short reads and writes; event
//! listeners and `request_frame` always run with it released.

use std::sync::{Arc, Weak};

use parking_lot::{Mutex, MutexGuard};
use smallvec::SmallVec;

use sel_animation::{AnimationScheduler, InterpolationRequest, ManualClock, RunHandle, RunState, Tick};
use sel_core::{Event, EventData, EventType, Listener};

use crate::document::{Document, NodeId};
use crate::error::Result;
use crate::selection::Selection;
use crate::selector::Selector;

pub type SharedDocument = Arc<Mutex<Document>>;

/// What to select
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Target<'a> {
    Selector(&'a str),
    Element(NodeId),
    /// The scrolling element
    Window,
}

impl<'a> From<&'a str> for Target<'a> {
    fn from(selector: &'a str) -> Self {
        Target::Selector(selector)
    }
}

impl<'a> From<&'a String> for Target<'a> {
    fn from(selector: &'a String) -> Self {
        Target::Selector(selector)
    }
}

impl From<NodeId> for Target<'_> {
    fn from(node: NodeId) -> Self {
        Target::Element(node)
    }
}

/// A document and its animation scheduler
#[derive(Clone)]
pub struct Page {
    document: SharedDocument,
    scheduler: AnimationScheduler,
}

impl Page {
    pub fn new(scheduler: AnimationScheduler) -> Self {
        Self::with_document(Document::new(), scheduler)
    }

    pub fn with_document(document: Document, scheduler: AnimationScheduler) -> Self {
        Self {
            document: Arc::new(Mutex::new(document)),
            scheduler,
        }
    }

    /// A page on a hand-driven clock
    pub fn headless() -> (Self, ManualClock) {
        let (scheduler, clock) = AnimationScheduler::manual();
        (Self::new(scheduler), clock)
    }

    /// Lock the document. Do not hold the guard across selection calls.
    pub fn document(&self) -> MutexGuard<'_, Document> {
        self.document.lock()
    }

    pub fn shared_document(&self) -> SharedDocument {
        self.document.clone()
    }

    pub fn scheduler(&self) -> &AnimationScheduler {
        &self.scheduler
    }

    /// Select elements. A selector matching nothing gives an empty selection.
    pub fn select<'a>(&self, target: impl Into<Target<'a>>) -> Result<Selection> {
        let nodes: SmallVec<[NodeId; 4]> = match target.into() {
            Target::Selector(selector) => {
                let selector = Selector::parse(selector)?;
                selector.query_all(&self.document.lock()).into_iter().collect()
            }
            Target::Element(node) => {
                let doc = self.document.lock();
                doc.element(node).map(|_| node).into_iter().collect()
            }
            Target::Window => smallvec::smallvec![self.document.lock().scrolling_element()],
        };
        Ok(Selection::new(self.clone(), nodes))
    }

    /// The scrolling element, standing in for the window
    pub fn window(&self) -> Selection {
        let root = self.document.lock().scrolling_element();
        Selection::new(self.clone(), smallvec::smallvec![root])
    }

    /// The `html` element, where document-wide custom properties live
    pub fn root(&self) -> Selection {
        let root = self.document.lock().root();
        Selection::new(self.clone(), smallvec::smallvec![root])
    }

    /// Advance every run one frame
    pub fn tick(&self) -> usize {
        self.scheduler.tick()
    }

    /// Drive a manual clock until idle or `max_frames` frames have run
    pub fn run_frames(&self, clock: &ManualClock, frame_ms: f64, max_frames: usize) -> usize {
        self.scheduler.run_frames(clock, frame_ms, max_frames)
    }

    /// Fire an event at `target`, then at its ancestors when `bubbles`.
    ///
    /// Listeners are collected under the lock and called after releasing it.
    /// Returns `None` when the target is gone.
    pub fn dispatch(
        &self,
        target: NodeId,
        event_type: &EventType,
        data: EventData,
        bubbles: bool,
    ) -> Option<Event> {
        let path: Vec<(NodeId, SmallVec<[Listener; 2]>)> = {
            let doc = self.document.lock();
            if !doc.contains(target) {
                return None;
            }
            let mut nodes = vec![target];
            if bubbles {
                nodes.extend(doc.ancestors(target));
            }
            nodes
                .into_iter()
                .map(|node| (node, doc.listeners().listeners(node.to_raw(), event_type)))
                .collect()
        };

        let mut event = Event::new(event_type.clone(), target.to_raw(), data);
        let mut calls = 0;
        for (node, listeners) in path {
            event.current_target = node.to_raw();
            for listener in listeners {
                if event.propagation_stopped {
                    break;
                }
                listener.call(&mut event);
                calls += 1;
            }
            if event.propagation_stopped {
                break;
            }
        }
        tracing::trace!("dispatched {} at {:?} to {} listener(s)", event_type, target, calls);
        Some(event)
    }
}

/// An event to fire once a frame's document writes are done
pub(crate) struct PendingEvent {
    pub event_type: EventType,
    pub data: EventData,
}

impl Page {
    /// Schedule a run whose callbacks write to `node`.
    ///
    /// Both callbacks get the locked document. Events returned from `on_tick`
    /// are dispatched at `node` after the lock is released. The run cancels
    /// itself on the first frame after `node` leaves the document.
    pub(crate) fn schedule_on_node<T, F>(
        &self,
        node: NodeId,
        request: InterpolationRequest,
        mut on_tick: T,
        on_finish: F,
    ) -> RunHandle
    where
        T: FnMut(&mut Document, Tick<'_>) -> Option<PendingEvent> + Send + 'static,
        F: FnOnce(&mut Document, RunState) + Send + 'static,
    {
        let slot: Arc<Mutex<Option<RunHandle>>> = Arc::default();
        let tick_slot = slot.clone();
        let page = self.clone();
        let document = self.shared_document();

        let handle = self.scheduler.schedule(
            request,
            Box::new(move |tick: Tick<'_>| {
                let pending = {
                    let mut doc = page.document.lock();
                    if doc.element(node).is_none() {
                        if let Some(handle) = tick_slot.lock().as_ref() {
                            tracing::trace!("run {} lost its element, cancelling", handle.id());
                            handle.cancel();
                        }
                        return;
                    }
                    on_tick(&mut *doc, tick)
                };
                if let Some(pending) = pending {
                    page.dispatch(node, &pending.event_type, pending.data, false);
                }
            }),
            Some(Box::new(move |state: RunState| {
                on_finish(&mut *document.lock(), state);
            })),
        );
        *slot.lock() = Some(handle.clone());
        handle
    }
}

/// A page that does not keep its document alive.
///
/// Listeners stored in the document hold this instead of a [`Page`].
#[derive(Clone)]
pub(crate) struct WeakPage {
    document: Weak<Mutex<Document>>,
    scheduler: AnimationScheduler,
}

impl WeakPage {
    pub(crate) fn upgrade(&self) -> Option<Page> {
        Some(Page {
            document: self.document.upgrade()?,
            scheduler: self.scheduler.clone(),
        })
    }
}

impl Page {
    pub(crate) fn downgrade(&self) -> WeakPage {
        WeakPage {
            document: Arc::downgrade(&self.document),
            scheduler: self.scheduler.clone(),
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(AnimationScheduler::system())
    }
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("document", &*self.document.lock())
            .field("active_runs", &self.scheduler.active_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DomError;
    use sel_core::events::event_types;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_select_targets() {
        let (page, _) = Page::headless();
        let div = {
            let mut doc = page.document();
            let body = doc.body();
            doc.append_element(body, "div").unwrap()
        };

        assert_eq!(page.select("div").unwrap().nodes(), &[div]);
        assert_eq!(page.select(div).unwrap().nodes(), &[div]);
        assert!(page.select("span").unwrap().is_empty());
        assert!(matches!(page.select("div >"), Err(DomError::InvalidSelector(_))));

        let root = page.document().root();
        assert_eq!(page.select(Target::Window).unwrap().nodes(), &[root]);
        assert_eq!(page.window().nodes(), &[root]);
    }

    #[test]
    fn test_removed_element_selects_nothing() {
        let (page, _) = Page::headless();
        let div = {
            let mut doc = page.document();
            let body = doc.body();
            let div = doc.append_element(body, "div").unwrap();
            doc.remove(div);
            div
        };
        assert!(page.select(div).unwrap().is_empty());
    }

    #[test]
    fn test_dispatch_bubbles_and_stops() {
        let (page, _) = Page::headless();
        let click = EventType::new(event_types::CLICK).unwrap();
        let (outer, inner) = {
            let mut doc = page.document();
            let body = doc.body();
            let outer = doc.append_element(body, "div").unwrap();
            let inner = doc.append_element(outer, "span").unwrap();
            (outer, inner)
        };

        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let count = Listener::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let stop = Listener::new(|event: &mut Event| event.stop_propagation());
        {
            let mut doc = page.document();
            doc.listeners_mut().register(outer.to_raw(), click.clone(), count.clone());
            doc.listeners_mut().register(inner.to_raw(), click.clone(), count.clone());
        }

        let event = page.dispatch(inner, &click, EventData::None, true).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(event.current_target, outer.to_raw());

        page.dispatch(inner, &click, EventData::None, false);
        assert_eq!(hits.load(Ordering::SeqCst), 3);

        {
            let mut doc = page.document();
            doc.listeners_mut().unregister(inner.to_raw(), &click, &count);
            doc.listeners_mut().register(inner.to_raw(), click.clone(), stop);
        }
        page.dispatch(inner, &click, EventData::None, true);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }
}
