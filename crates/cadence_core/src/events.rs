//! Event dispatch system
//!
//! Listeners are attached per (target, event type) and detached by handle.

use crate::sync::lock;
use rustc_hash::FxHashMap;
use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;
use std::sync::{Arc, Mutex};

/// Event type identifier
pub type EventType = u32;

/// Common event types
pub mod event_types {
    use super::EventType;

    pub const POINTER_DOWN: EventType = 1;
    pub const POINTER_UP: EventType = 2;
    pub const POINTER_MOVE: EventType = 3;
    pub const POINTER_ENTER: EventType = 4;
    pub const POINTER_LEAVE: EventType = 5;
}

/// Identifies something events can be dispatched to (an element or the window)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TargetId(pub u64);

impl TargetId {
    /// The whole viewport
    pub const WINDOW: TargetId = TargetId(0);
}

new_key_type! {
    /// Handle returned when attaching a listener
    pub struct ListenerId;
}

/// A UI event with associated data
#[derive(Clone, Debug)]
pub struct Event {
    pub event_type: EventType,
    pub target: TargetId,
    pub data: EventData,
    pub timestamp: u64,
    pub propagation_stopped: bool,
}

/// Event-specific data
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EventData {
    Pointer { x: f32, y: f32 },
    None,
}

impl Event {
    pub fn new(event_type: EventType, target: TargetId) -> Self {
        Self {
            event_type,
            target,
            data: EventData::None,
            timestamp: 0,
            propagation_stopped: false,
        }
    }

    /// Create a pointer event at the given coordinates
    pub fn pointer(event_type: EventType, target: TargetId, x: f32, y: f32) -> Self {
        Self {
            data: EventData::Pointer { x, y },
            ..Self::new(event_type, target)
        }
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }
}

/// Event handler function type
pub type EventHandler = Arc<dyn Fn(&mut Event) + Send + Sync>;

struct Listener {
    target: TargetId,
    event_type: EventType,
    handler: EventHandler,
}

#[derive(Default)]
struct DispatcherInner {
    listeners: SlotMap<ListenerId, Listener>,
    by_target: FxHashMap<(TargetId, EventType), SmallVec<[ListenerId; 4]>>,
}

/// Dispatches events to registered handlers
pub struct EventDispatcher {
    inner: Mutex<DispatcherInner>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(DispatcherInner::default()),
        }
    }

    /// Create a dispatcher ready to be shared between hooks
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Attach a handler for an event type on a target
    pub fn add_listener<F>(&self, target: TargetId, event_type: EventType, handler: F) -> ListenerId
    where
        F: Fn(&mut Event) + Send + Sync + 'static,
    {
        let mut inner = lock(&self.inner);
        let id = inner.listeners.insert(Listener {
            target,
            event_type,
            handler: Arc::new(handler),
        });
        inner.by_target.entry((target, event_type)).or_default().push(id);
        id
    }

    /// Detach a handler. Returns `false` if it was already removed.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut inner = lock(&self.inner);
        let Some(listener) = inner.listeners.remove(id) else {
            return false;
        };

        let key = (listener.target, listener.event_type);
        if let Some(ids) = inner.by_target.get_mut(&key) {
            ids.retain(|existing| *existing != id);
            if ids.is_empty() {
                inner.by_target.remove(&key);
            }
        }
        true
    }

    /// Number of handlers attached for a target and event type
    pub fn listener_count(&self, target: TargetId, event_type: EventType) -> usize {
        lock(&self.inner)
            .by_target
            .get(&(target, event_type))
            .map_or(0, |ids| ids.len())
    }

    /// Dispatch an event to all registered handlers
    ///
    /// Handlers run in registration order without the dispatcher lock held.
    /// A handler detached by an earlier handler in the same dispatch is skipped.
    pub fn dispatch(&self, event: &mut Event) {
        let ids: SmallVec<[ListenerId; 4]> = match lock(&self.inner)
            .by_target
            .get(&(event.target, event.event_type))
        {
            Some(ids) => ids.clone(),
            None => return,
        };

        for id in ids {
            if event.propagation_stopped {
                break;
            }
            let handler = match lock(&self.inner).listeners.get(id) {
                Some(listener) => listener.handler.clone(),
                None => continue,
            };
            handler(&mut *event);
        }
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
