//! Cadence Hooks
//!
//! Stateful timing primitives for UI code. Each hook is a self-contained
//! state machine driven by a [`TimerService`](cadence_core::TimerService) and,
//! where it listens to input, an [`EventDispatcher`](cadence_core::EventDispatcher):
//!
//! - [`Countdown`]: start/pause/resume/reset/toggle with a one-shot completion callback
//! - [`DebouncedCallback`]: coalesce rapid calls into one delayed invocation
//! - [`DebouncedValue`]: a value that follows its source after a quiet period
//! - [`HoverDetector`]: hover flag with independent enter/leave delays
//! - [`MousePositionTracker`]: pointer position gated by debounce or throttle
//!
//! Constructing a hook mounts it; dropping it unmounts it. Dropping cancels
//! every outstanding timer and detaches every listener, and no timer or
//! listener closure keeps hook state alive.
//!
//! # Example
//!
//! ```rust
//! use std::sync::{Arc, Mutex};
//! use std::time::Duration;
//!
//! use cadence_core::TimerScheduler;
//! use cadence_hooks::{DebouncedCallback, DebounceOptions, HookContext};
//!
//! let timers = TimerScheduler::shared();
//! let ctx = HookContext::headless(timers.clone());
//!
//! let saved = Arc::new(Mutex::new(Vec::new()));
//! let sink = saved.clone();
//! let save = DebouncedCallback::new(&ctx, DebounceOptions::default(), move |text: String| {
//!     sink.lock().unwrap().push(text);
//! });
//!
//! save.call("h".to_string());
//! save.call("he".to_string());
//! timers.advance(Duration::from_millis(500));
//!
//! assert_eq!(*saved.lock().unwrap(), vec!["he".to_string()]);
//! ```

pub mod config;
pub mod context;
pub mod countdown;
pub mod debounce;
pub mod hover;
pub mod mouse;

pub use config::HooksConfig;
pub use context::HookContext;
pub use countdown::{Countdown, CountdownOptions, CountdownPhase};
pub use debounce::{DebounceOptions, DebouncedCallback, DebouncedValue};
pub use hover::{HoverDetector, HoverOptions, HoverPhase};
pub use mouse::{MouseOptions, MousePolicy, MousePositionTracker, Position};
