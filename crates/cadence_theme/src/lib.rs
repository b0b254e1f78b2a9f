//! Cadence Theme
//!
//! Tri-state theme selection: an explicit light or dark choice, or
//! following the system color-scheme preference.
//!
//! # Overview
//!
//! - [`ThemeMode`]: what the user picked (`light`, `dark`, `system`)
//! - [`ColorScheme`]: what is actually shown
//! - [`TernaryDarkMode`]: persists the mode, follows system preference
//!   changes while in `system` mode, keeps a document class in sync and
//!   picks up changes other contexts make to the persisted mode
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use cadence_core::{MediaQueryList, MemoryStore};
//! use cadence_theme::{
//!     BrowserHost, DarkModeOptions, DocumentClass, DocumentRoot, TernaryDarkMode, ThemeHost,
//!     ThemeMode,
//! };
//!
//! let media = MediaQueryList::prefers_dark(true);
//! let document = Arc::new(DocumentRoot::new());
//! let host = ThemeHost::Browser(BrowserHost::new(MemoryStore::shared(), media, document.clone()));
//!
//! let theme = TernaryDarkMode::new(host, DarkModeOptions::default());
//! assert_eq!(theme.mode(), ThemeMode::System);
//! assert!(theme.is_dark());
//! assert!(document.has_class("dark"));
//!
//! theme.toggle();
//! assert_eq!(theme.mode(), ThemeMode::Light);
//! assert!(!document.has_class("dark"));
//! ```

pub mod dark_mode;
pub mod document;
pub mod error;
pub mod scheme;

pub use dark_mode::{BrowserHost, DarkModeOptions, TernaryDarkMode, ThemeHost, DEFAULT_STORAGE_KEY};
pub use document::{DocumentClass, DocumentRoot};
pub use error::{ThemeError, ThemeResult};
pub use scheme::{ColorScheme, ThemeMode};
