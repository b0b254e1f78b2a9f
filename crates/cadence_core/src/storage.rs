//! Key-value persistence
//!
//! A string-keyed store with change notification. Values are strings; the
//! [`JsonStoreExt`] extension layers `serde_json` encoding on top.
//!
//! Every successful mutation notifies every subscriber, including the one
//! that caused it. Consumers sharing a store therefore behave like browser
//! tabs sharing `localStorage` and must treat notifications as
//! authoritative rather than assuming exclusive ownership of a key.

use crate::error::{StorageError, StorageResult};
use crate::sync::lock;
use rustc_hash::FxHashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;
use std::sync::{Arc, Mutex};

new_key_type! {
    /// Handle returned when subscribing to store changes
    pub struct SubscriptionId;
}

/// A change to a stored key
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageEvent {
    pub key: String,
    /// New raw value, `None` when the key was removed
    pub new_value: Option<String>,
}

/// Change listener
pub type StorageListener = Arc<dyn Fn(&StorageEvent) + Send + Sync>;

/// Durable string key-value storage with change notification
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    fn remove(&self, key: &str) -> StorageResult<()>;

    /// Register a listener for changes to any key
    fn subscribe(&self, listener: StorageListener) -> SubscriptionId;

    /// Remove a listener. Unknown ids are ignored.
    fn unsubscribe(&self, id: SubscriptionId);
}

/// JSON helpers for any [`KeyValueStore`]
pub trait JsonStoreExt {
    /// Read and decode a JSON value
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> StorageResult<Option<T>>;

    /// Encode and write a JSON value
    fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> StorageResult<()>;
}

impl<S: KeyValueStore + ?Sized> JsonStoreExt for S {
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> StorageResult<Option<T>> {
        match self.get(key)? {
            Some(raw) => decode_json(key, &raw).map(Some),
            None => Ok(None),
        }
    }

    fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> StorageResult<()> {
        let raw = serde_json::to_string(value).map_err(|err| StorageError::Encode {
            key: key.to_string(),
            message: err.to_string(),
        })?;
        self.set(key, &raw)
    }
}

/// Decode a raw stored value, e.g. one carried by a [`StorageEvent`]
pub fn decode_json<T: DeserializeOwned>(key: &str, raw: &str) -> StorageResult<T> {
    serde_json::from_str(raw).map_err(|err| StorageError::Decode {
        key: key.to_string(),
        message: err.to_string(),
    })
}

#[derive(Default)]
struct StoreInner {
    entries: FxHashMap<String, String>,
    listeners: SlotMap<SubscriptionId, StorageListener>,
}

impl StoreInner {
    fn used_bytes(&self) -> usize {
        self.entries.iter().map(|(k, v)| k.len() + v.len()).sum()
    }
}

/// In-memory [`KeyValueStore`]
pub struct MemoryStore {
    inner: Mutex<StoreInner>,
    quota: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(StoreInner::default()),
            quota: None,
        }
    }

    /// Create a store that rejects writes beyond `bytes` (keys plus values)
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            quota: Some(bytes),
            ..Self::new()
        }
    }

    /// Create a store ready to be shared
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        lock(&self.inner).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn notify(&self, event: StorageEvent) {
        let listeners: SmallVec<[StorageListener; 4]> =
            lock(&self.inner).listeners.values().cloned().collect();
        tracing::trace!(key = %event.key, listeners = listeners.len(), "storage change");
        for listener in listeners {
            listener(&event);
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(lock(&self.inner).entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        {
            let mut inner = lock(&self.inner);
            if let Some(limit) = self.quota {
                let replaced = inner.entries.get(key).map_or(0, |old| key.len() + old.len());
                if inner.used_bytes() - replaced + key.len() + value.len() > limit {
                    tracing::warn!(key, limit, "storage quota exceeded");
                    return Err(StorageError::QuotaExceeded {
                        key: key.to_string(),
                        limit,
                    });
                }
            }
            inner.entries.insert(key.to_string(), value.to_string());
        }

        self.notify(StorageEvent {
            key: key.to_string(),
            new_value: Some(value.to_string()),
        });
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        if lock(&self.inner).entries.remove(key).is_none() {
            return Ok(());
        }

        self.notify(StorageEvent {
            key: key.to_string(),
            new_value: None,
        });
        Ok(())
    }

    fn subscribe(&self, listener: StorageListener) -> SubscriptionId {
        lock(&self.inner).listeners.insert(listener)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        lock(&self.inner).listeners.remove(id);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}
