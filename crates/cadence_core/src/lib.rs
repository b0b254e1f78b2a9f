//! Cadence Core Runtime
//!
//! This crate provides the host collaborators the Cadence timing hooks are
//! built on:
//!
//! - **Timers**: schedule-once / schedule-repeating with cancellation by handle,
//!   driven either by virtual time or by the wall clock
//! - **Event Dispatch**: attach/detach listeners per target and event type
//! - **Storage**: key-value persistence with cross-context change notification
//! - **Media Queries**: system preference flags with change listeners
//! - **State Machines**: small typed statecharts for hook phases
//!
//! # Example
//!
//! ```rust
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use cadence_core::timer::{TimerScheduler, TimerService};
//!
//! let timers = TimerScheduler::new();
//! let fired = Arc::new(AtomicU32::new(0));
//!
//! let counter = fired.clone();
//! timers.schedule_once(
//!     Duration::from_millis(100),
//!     Arc::new(move || {
//!         counter.fetch_add(1, Ordering::SeqCst);
//!     }),
//! );
//!
//! timers.advance(Duration::from_millis(99));
//! assert_eq!(fired.load(Ordering::SeqCst), 0);
//!
//! timers.advance(Duration::from_millis(1));
//! assert_eq!(fired.load(Ordering::SeqCst), 1);
//! ```

pub mod error;
pub mod events;
pub mod fsm;
pub mod media;
pub mod storage;
pub mod sync;
pub mod timer;

pub use error::{ConfigError, StorageError};
pub use events::{Event, EventData, EventDispatcher, EventType, ListenerId, TargetId};
pub use fsm::{StateMachine, Transition};
pub use media::{MediaQuery, MediaQueryList};
pub use storage::{JsonStoreExt, KeyValueStore, MemoryStore, StorageEvent, SubscriptionId};
pub use timer::{TimerCallback, TimerHandle, TimerScheduler, TimerService};
