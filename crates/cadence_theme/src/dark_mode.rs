//! Ternary dark mode
//!
//! Resolution is a pure function of the selected [`ThemeMode`] and the
//! system preference. The selection is persisted as JSON under a storage
//! key; writes made by other consumers of the same store are picked up
//! through its change notifications.
//!
//! Persistence failures never panic or propagate: the previous mode is
//! kept and the failure is available from [`TernaryDarkMode::last_error`].

use crate::document::DocumentClass;
use crate::error::{ThemeError, ThemeResult};
use crate::scheme::{ColorScheme, ThemeMode};
use cadence_core::media::{MediaListener, MediaListenerId, MediaQuery};
use cadence_core::storage::{decode_json, StorageListener};
use cadence_core::sync::lock;
use cadence_core::{JsonStoreExt, KeyValueStore, StorageEvent, SubscriptionId};
use serde::Deserialize;
use std::sync::{Arc, Mutex, Weak};

/// Storage key used unless [`DarkModeOptions::storage_key`] overrides it
pub const DEFAULT_STORAGE_KEY: &str = "cadence-ternary-dark-mode";

/// Dark mode configuration
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DarkModeOptions {
    /// Mode used when nothing is persisted
    pub default_mode: ThemeMode,
    pub storage_key: String,
    /// Class toggled on the document root while dark
    pub class_name: String,
}

impl Default for DarkModeOptions {
    fn default() -> Self {
        Self {
            default_mode: ThemeMode::System,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            class_name: "dark".to_string(),
        }
    }
}

/// Services available in an interactive host
#[derive(Clone)]
pub struct BrowserHost {
    pub storage: Arc<dyn KeyValueStore>,
    pub media: Arc<dyn MediaQuery>,
    pub document: Arc<dyn DocumentClass>,
}

impl BrowserHost {
    pub fn new(
        storage: Arc<dyn KeyValueStore>,
        media: Arc<dyn MediaQuery>,
        document: Arc<dyn DocumentClass>,
    ) -> Self {
        Self {
            storage,
            media,
            document,
        }
    }
}

/// Where the resolver runs
#[derive(Clone)]
pub enum ThemeHost {
    /// No storage, media query or document: report the default mode, never dark
    Server,
    Browser(BrowserHost),
}

struct DarkModeState {
    mode: ThemeMode,
    system: ColorScheme,
    last_error: Option<ThemeError>,
}

impl DarkModeState {
    fn scheme(&self) -> ColorScheme {
        self.mode.resolve(self.system)
    }
}

struct DarkModeShared {
    state: Mutex<DarkModeState>,
    host: BrowserHost,
    options: DarkModeOptions,
}

enum Binding {
    Server {
        mode: ThemeMode,
    },
    Browser {
        shared: Arc<DarkModeShared>,
        storage_subscription: SubscriptionId,
        media_subscription: MediaListenerId,
    },
}

/// Light / dark / system theme selection
pub struct TernaryDarkMode {
    binding: Binding,
}

impl TernaryDarkMode {
    pub fn new(host: ThemeHost, options: DarkModeOptions) -> Self {
        let host = match host {
            ThemeHost::Server => {
                tracing::debug!(mode = ?options.default_mode, "dark mode on server host");
                return Self {
                    binding: Binding::Server {
                        mode: options.default_mode,
                    },
                };
            }
            ThemeHost::Browser(host) => host,
        };

        let mut last_error = None;
        let mode = match host.storage.get_json::<ThemeMode>(&options.storage_key) {
            Ok(stored) => stored.unwrap_or(options.default_mode),
            Err(err) => {
                tracing::warn!(
                    key = %options.storage_key,
                    %err,
                    "ignoring unreadable theme mode"
                );
                last_error = Some(ThemeError::Load(err));
                options.default_mode
            }
        };

        let shared = Arc::new(DarkModeShared {
            state: Mutex::new(DarkModeState {
                mode,
                system: ColorScheme::from_dark(host.media.matches()),
                last_error,
            }),
            host,
            options,
        });
        shared.sync_class(&lock(&shared.state));

        let weak: Weak<DarkModeShared> = Arc::downgrade(&shared);
        let on_storage: StorageListener = Arc::new(move |event: &StorageEvent| {
            if let Some(shared) = weak.upgrade() {
                shared.on_storage_change(event);
            }
        });
        let storage_subscription = shared.host.storage.subscribe(on_storage);

        let weak: Weak<DarkModeShared> = Arc::downgrade(&shared);
        let on_system: MediaListener = Arc::new(move |matches: bool| {
            if let Some(shared) = weak.upgrade() {
                shared.on_system_change(matches);
            }
        });
        let media_subscription = shared.host.media.subscribe(on_system);

        tracing::debug!(?mode, "dark mode mounted");
        Self {
            binding: Binding::Browser {
                shared,
                storage_subscription,
                media_subscription,
            },
        }
    }

    /// The selected mode
    pub fn mode(&self) -> ThemeMode {
        match &self.binding {
            Binding::Server { mode } => *mode,
            Binding::Browser { shared, .. } => lock(&shared.state).mode,
        }
    }

    /// The scheme currently shown
    pub fn scheme(&self) -> ColorScheme {
        match &self.binding {
            Binding::Server { .. } => ColorScheme::Light,
            Binding::Browser { shared, .. } => lock(&shared.state).scheme(),
        }
    }

    pub fn is_dark(&self) -> bool {
        self.scheme().is_dark()
    }

    /// Last absorbed persistence failure, cleared by the next successful setter
    pub fn last_error(&self) -> Option<ThemeError> {
        match &self.binding {
            Binding::Server { .. } => None,
            Binding::Browser { shared, .. } => lock(&shared.state).last_error.clone(),
        }
    }

    pub fn is_server(&self) -> bool {
        matches!(self.binding, Binding::Server { .. })
    }

    pub fn set_light(&self) {
        self.set_mode(ThemeMode::Light);
    }

    pub fn set_dark(&self) {
        self.set_mode(ThemeMode::Dark);
    }

    pub fn set_system(&self) {
        self.set_mode(ThemeMode::System);
    }

    /// Select and persist `mode`. No-op when it is already selected.
    pub fn set_mode(&self, mode: ThemeMode) {
        if let Binding::Browser { shared, .. } = &self.binding {
            shared.set_mode(mode);
        }
    }

    /// Flip to the explicit mode opposite to what is shown
    pub fn toggle(&self) {
        if let Binding::Browser { shared, .. } = &self.binding {
            let next = {
                let state = lock(&shared.state);
                state.mode.toggled(state.system)
            };
            shared.set_mode(next);
        }
    }
}

impl DarkModeShared {
    fn set_mode(&self, mode: ThemeMode) {
        if lock(&self.state).mode == mode {
            return;
        }

        // The store notifies synchronously, so no state lock across the write
        match self.persist(mode) {
            Ok(()) => {
                let mut state = lock(&self.state);
                state.mode = mode;
                state.last_error = None;
                self.sync_class(&state);
                tracing::debug!(?mode, scheme = ?state.scheme(), "theme mode set");
            }
            Err(err) => {
                tracing::warn!(?mode, %err, "keeping previous theme mode");
                lock(&self.state).last_error = Some(err);
            }
        }
    }

    fn persist(&self, mode: ThemeMode) -> ThemeResult<()> {
        self.host.storage.set_json(&self.options.storage_key, &mode)?;
        Ok(())
    }

    fn on_storage_change(&self, event: &StorageEvent) {
        if event.key != self.options.storage_key {
            return;
        }

        let mut state = lock(&self.state);
        match event.new_value.as_deref() {
            None => state.mode = self.options.default_mode,
            Some(raw) => match decode_json::<ThemeMode>(&event.key, raw) {
                Ok(mode) => state.mode = mode,
                Err(err) => {
                    tracing::warn!(key = %event.key, %err, "ignoring unreadable theme mode");
                    state.last_error = Some(ThemeError::Load(err));
                    return;
                }
            },
        }
        tracing::trace!(mode = ?state.mode, "theme mode synchronized from storage");
        self.sync_class(&state);
    }

    fn on_system_change(&self, dark: bool) {
        let mut state = lock(&self.state);
        state.system = ColorScheme::from_dark(dark);
        if state.mode == ThemeMode::System {
            tracing::debug!(dark, "system color scheme changed");
            self.sync_class(&state);
        }
    }

    fn sync_class(&self, state: &DarkModeState) {
        self.host
            .document
            .set_class(&self.options.class_name, state.scheme().is_dark());
    }
}

impl Drop for TernaryDarkMode {
    fn drop(&mut self) {
        if let Binding::Browser {
            shared,
            storage_subscription,
            media_subscription,
        } = &self.binding
        {
            shared.host.storage.unsubscribe(*storage_subscription);
            shared.host.media.unsubscribe(*media_subscription);
            tracing::debug!("dark mode unmounted");
        }
    }
}
