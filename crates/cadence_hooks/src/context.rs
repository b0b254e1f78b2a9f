//! Host resources shared by hooks
//!
//! A [`HookContext`] bundles the timer service and, when the host has one,
//! the event source. A context without an event source models a non-browser
//! host: input-driven hooks mount without listening and report their
//! defaults instead of failing.

use cadence_core::{EventDispatcher, TimerService};
use std::sync::Arc;

/// Timer and event services handed to every hook
#[derive(Clone)]
pub struct HookContext {
    timers: Arc<dyn TimerService>,
    events: Option<Arc<EventDispatcher>>,
}

impl HookContext {
    /// Context for a host with both timers and input events
    pub fn new(timers: Arc<dyn TimerService>, events: Arc<EventDispatcher>) -> Self {
        Self {
            timers,
            events: Some(events),
        }
    }

    /// Context for a host without input events (server-side, tests of pure timing)
    pub fn headless(timers: Arc<dyn TimerService>) -> Self {
        Self {
            timers,
            events: None,
        }
    }

    pub fn timers(&self) -> &Arc<dyn TimerService> {
        &self.timers
    }

    pub fn events(&self) -> Option<&Arc<EventDispatcher>> {
        self.events.as_ref()
    }
}

impl std::fmt::Debug for HookContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookContext")
            .field("has_events", &self.events.is_some())
            .finish_non_exhaustive()
    }
}
