//! Event dispatch system
//!
//! Listener registration keyed by node and event name, with handler identity
//! so the same listener can later be removed again.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    #[error("invalid event name `{0}`")]
    InvalidName(String),
}

/// Common event names
pub mod event_types {
    pub const CLICK: &str = "click";
    pub const DBLCLICK: &str = "dblclick";
    pub const POINTER_DOWN: &str = "pointerdown";
    pub const POINTER_UP: &str = "pointerup";
    pub const POINTER_MOVE: &str = "pointermove";
    pub const POINTER_CANCEL: &str = "pointercancel";
    pub const MOUSE_ENTER: &str = "mouseenter";
    pub const MOUSE_LEAVE: &str = "mouseleave";
    pub const FOCUS: &str = "focus";
    pub const BLUR: &str = "blur";
    pub const INPUT: &str = "input";
    pub const CHANGE: &str = "change";
    pub const KEY_DOWN: &str = "keydown";
    pub const KEY_UP: &str = "keyup";
    pub const SCROLL: &str = "scroll";
    pub const WHEEL: &str = "wheel";
    pub const RESIZE: &str = "resize";
    pub const TRANSITION_END: &str = "transitionend";
    pub const ANIMATION_END: &str = "animationend";
}

/// Name of an event, normalized to lowercase
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EventType(String);

impl EventType {
    pub fn new(name: &str) -> Result<Self, EventError> {
        let name = name.trim();
        if name.is_empty() || name.chars().any(|c| c.is_whitespace()) {
            return Err(EventError::InvalidName(name.to_string()));
        }
        Ok(Self(name.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for EventType {
    type Err = EventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// An event travelling through the document
#[derive(Clone, Debug)]
pub struct Event {
    pub event_type: EventType,
    /// Node the event was dispatched at
    pub target: u64,
    /// Node whose listeners are currently running
    pub current_target: u64,
    pub data: EventData,
    pub propagation_stopped: bool,
    pub default_prevented: bool,
}

/// Event-specific data
#[derive(Clone, Debug, Default, PartialEq)]
pub enum EventData {
    Pointer {
        x: f32,
        y: f32,
        button: u8,
    },
    Key {
        key: String,
    },
    Scroll {
        left: f32,
        top: f32,
    },
    #[default]
    None,
}

impl Event {
    pub fn new(event_type: EventType, target: u64, data: EventData) -> Self {
        Self {
            event_type,
            target,
            current_target: target,
            data,
            propagation_stopped: false,
            default_prevented: false,
        }
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }
}

/// A registered event handler.
///
/// Cloning shares the handler; two listeners compare equal only when they are
/// clones of the same registration, which is what `off` matches on.
#[derive(Clone)]
pub struct Listener(Arc<dyn Fn(&mut Event) + Send + Sync>);

impl Listener {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&mut Event) + Send + Sync + 'static,
    {
        Self(Arc::new(handler))
    }

    pub fn call(&self, event: &mut Event) {
        (self.0)(event)
    }
}

impl PartialEq for Listener {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Listener")
            .field(&Arc::as_ptr(&self.0).cast::<()>())
            .finish()
    }
}

/// Dispatches events to registered listeners
#[derive(Default)]
pub struct EventDispatcher {
    handlers: FxHashMap<(u64, EventType), SmallVec<[Listener; 2]>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for a node and event type.
    ///
    /// Registering the same listener twice for the same pair is ignored.
    pub fn register(&mut self, node: u64, event_type: EventType, listener: Listener) {
        let entry = self.handlers.entry((node, event_type)).or_default();
        if entry.contains(&listener) {
            tracing::trace!("listener already registered on node {}", node);
            return;
        }
        entry.push(listener);
    }

    /// Remove a listener. Returns whether anything was removed.
    pub fn unregister(&mut self, node: u64, event_type: &EventType, listener: &Listener) -> bool {
        let key = (node, event_type.clone());
        let Some(entry) = self.handlers.get_mut(&key) else {
            return false;
        };
        let before = entry.len();
        entry.retain(|l| l != listener);
        let removed = entry.len() != before;
        if entry.is_empty() {
            self.handlers.remove(&key);
        }
        removed
    }

    /// Drop every listener attached to a node
    pub fn clear_node(&mut self, node: u64) {
        self.handlers.retain(|(n, _), _| *n != node);
    }

    /// Listeners for a node and event type, cloned so callers can run them
    /// without holding a borrow on the dispatcher
    pub fn listeners(&self, node: u64, event_type: &EventType) -> SmallVec<[Listener; 2]> {
        self.handlers
            .get(&(node, event_type.clone()))
            .cloned()
            .unwrap_or_default()
    }

    pub fn listener_count(&self, node: u64, event_type: &EventType) -> usize {
        self.handlers
            .get(&(node, event_type.clone()))
            .map_or(0, |l| l.len())
    }

    /// Dispatch an event to the listeners registered on `event.current_target`
    pub fn dispatch(&self, event: &mut Event) {
        for listener in self.listeners(event.current_target, &event.event_type) {
            if event.propagation_stopped {
                break;
            }
            listener.call(event);
        }
    }
}
