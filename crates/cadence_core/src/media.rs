//! Media queries
//!
//! A boolean system preference (such as `prefers-color-scheme: dark`) with
//! change listeners.

use crate::sync::lock;
use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;
use std::sync::{Arc, Mutex};

/// The media query dark-mode resolution listens to
pub const PREFERS_DARK: &str = "(prefers-color-scheme: dark)";

new_key_type! {
    /// Handle returned when subscribing to a media query
    pub struct MediaListenerId;
}

/// Listener invoked with the new `matches` value
pub type MediaListener = Arc<dyn Fn(bool) + Send + Sync>;

/// A live media query
pub trait MediaQuery: Send + Sync {
    /// The query text
    fn query(&self) -> &str;

    /// Whether the query currently matches
    fn matches(&self) -> bool;

    fn subscribe(&self, listener: MediaListener) -> MediaListenerId;

    fn unsubscribe(&self, id: MediaListenerId);
}

struct MediaInner {
    matches: bool,
    listeners: SlotMap<MediaListenerId, MediaListener>,
}

/// In-memory [`MediaQuery`] whose result is set by the host
pub struct MediaQueryList {
    query: String,
    inner: Mutex<MediaInner>,
}

impl MediaQueryList {
    pub fn new(query: impl Into<String>, matches: bool) -> Self {
        Self {
            query: query.into(),
            inner: Mutex::new(MediaInner {
                matches,
                listeners: SlotMap::with_key(),
            }),
        }
    }

    /// The `prefers-color-scheme: dark` query
    pub fn prefers_dark(matches: bool) -> Arc<Self> {
        Arc::new(Self::new(PREFERS_DARK, matches))
    }

    /// Update the result, notifying listeners if it changed
    pub fn set_matches(&self, matches: bool) {
        let listeners: SmallVec<[MediaListener; 2]> = {
            let mut inner = lock(&self.inner);
            if inner.matches == matches {
                return;
            }
            inner.matches = matches;
            inner.listeners.values().cloned().collect()
        };

        tracing::debug!(query = %self.query, matches, "media query changed");
        for listener in listeners {
            listener(matches);
        }
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.inner).listeners.len()
    }
}

impl MediaQuery for MediaQueryList {
    fn query(&self) -> &str {
        &self.query
    }

    fn matches(&self) -> bool {
        lock(&self.inner).matches
    }

    fn subscribe(&self, listener: MediaListener) -> MediaListenerId {
        lock(&self.inner).listeners.insert(listener)
    }

    fn unsubscribe(&self, id: MediaListenerId) {
        lock(&self.inner).listeners.remove(id);
    }
}
