//! Debounced callbacks and values
//!
//! [`DebouncedCallback`] coalesces rapid calls: every call restarts a quiet
//! window and only the last call's arguments are delivered when the window
//! closes. [`DebouncedValue`] builds on it to expose a value that follows its
//! source only after the source stops changing.

use crate::context::HookContext;
use cadence_core::sync::lock;
use cadence_core::{TimerHandle, TimerService};
use serde::Deserialize;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

/// Debounce configuration
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DebounceOptions {
    /// Quiet period before the pending call is delivered
    pub delay_ms: u64,
    /// Invoke on the first call of a window
    pub leading: bool,
    /// Invoke with the last call's arguments when the window closes
    pub trailing: bool,
    /// Upper bound on how long a pending call may be deferred
    pub max_wait_ms: Option<u64>,
}

impl Default for DebounceOptions {
    fn default() -> Self {
        Self {
            delay_ms: 500,
            leading: false,
            trailing: true,
            max_wait_ms: None,
        }
    }
}

impl DebounceOptions {
    /// Trailing-edge debounce with the given delay
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay_ms: delay.as_millis() as u64,
            ..Self::default()
        }
    }
}

type DebouncedFn<A> = Arc<dyn Fn(A) + Send + Sync>;

struct DebounceState<A> {
    pending: Option<A>,
    window: Option<TimerHandle>,
    max_wait: Option<TimerHandle>,
    delay: Duration,
}

struct DebounceShared<A> {
    state: Mutex<DebounceState<A>>,
    callback: Mutex<DebouncedFn<A>>,
    timers: Arc<dyn TimerService>,
    leading: bool,
    trailing: bool,
    max_wait: Option<Duration>,
}

/// A callback whose invocations are debounced
pub struct DebouncedCallback<A: Send + 'static> {
    shared: Arc<DebounceShared<A>>,
}

impl<A: Send + 'static> DebouncedCallback<A> {
    pub fn new<F>(ctx: &HookContext, options: DebounceOptions, callback: F) -> Self
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        Self {
            shared: Arc::new(DebounceShared {
                state: Mutex::new(DebounceState {
                    pending: None,
                    window: None,
                    max_wait: None,
                    delay: Duration::from_millis(options.delay_ms),
                }),
                callback: Mutex::new(Arc::new(callback)),
                timers: ctx.timers().clone(),
                leading: options.leading,
                trailing: options.trailing,
                max_wait: options.max_wait_ms.map(Duration::from_millis),
            }),
        }
    }

    /// Record `args` and restart the quiet window.
    ///
    /// With `leading` set, the first call of a window is delivered
    /// immediately and later calls in the same window wait for its end.
    pub fn call(&self, args: A) {
        let shared = &self.shared;
        let immediate = {
            let mut state = lock(&shared.state);
            let idle = state.window.is_none();

            if let Some(handle) = state.window.take() {
                shared.timers.cancel(handle);
            }
            let weak = Arc::downgrade(shared);
            state.window = Some(shared.timers.schedule_once(
                state.delay,
                Arc::new(move || DebounceShared::with(&weak, DebounceShared::on_window_end)),
            ));

            if let (Some(max_wait), None) = (shared.max_wait, state.max_wait) {
                let weak = Arc::downgrade(shared);
                state.max_wait = Some(shared.timers.schedule_once(
                    max_wait,
                    Arc::new(move || DebounceShared::with(&weak, DebounceShared::on_max_wait)),
                ));
            }

            if idle && shared.leading {
                Some(args)
            } else {
                state.pending = Some(args);
                None
            }
        };

        if let Some(args) = immediate {
            tracing::trace!("debounce leading edge");
            shared.invoke(args);
        }
    }

    /// Discard the pending invocation, if any
    pub fn cancel(&self) {
        let mut state = lock(&self.shared.state);
        self.shared.clear_timers(&mut state);
        state.pending = None;
    }

    /// Deliver the pending invocation now, if any
    pub fn flush(&self) {
        let args = {
            let mut state = lock(&self.shared.state);
            self.shared.clear_timers(&mut state);
            state.pending.take()
        };

        if let Some(args) = args {
            tracing::trace!("debounce flushed");
            self.shared.invoke(args);
        }
    }

    /// Whether a call is waiting to be delivered
    pub fn is_pending(&self) -> bool {
        lock(&self.shared.state).pending.is_some()
    }

    /// Replace the delivered callback; a pending call will reach the new one
    pub fn set_callback<F>(&self, callback: F)
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        *lock(&self.shared.callback) = Arc::new(callback);
    }

    /// Change the quiet period for windows started after this call
    pub fn set_delay(&self, delay: Duration) {
        lock(&self.shared.state).delay = delay;
    }

    pub fn delay(&self) -> Duration {
        lock(&self.shared.state).delay
    }
}

impl<A: Send + 'static> DebounceShared<A> {
    fn with(weak: &Weak<Self>, f: fn(&Self)) {
        if let Some(shared) = weak.upgrade() {
            f(&shared);
        }
    }

    fn on_window_end(&self) {
        let args = {
            let mut state = lock(&self.state);
            state.window = None;
            if let Some(handle) = state.max_wait.take() {
                self.timers.cancel(handle);
            }
            let pending = state.pending.take();
            if self.trailing {
                pending
            } else {
                None
            }
        };

        if let Some(args) = args {
            self.invoke(args);
        }
    }

    fn on_max_wait(&self) {
        let args = {
            let mut state = lock(&self.state);
            state.max_wait = None;
            state.pending.take()
        };

        if let Some(args) = args {
            tracing::trace!("debounce max wait reached");
            self.invoke(args);
        }
    }

    fn clear_timers(&self, state: &mut DebounceState<A>) {
        for handle in [state.window.take(), state.max_wait.take()].into_iter().flatten() {
            self.timers.cancel(handle);
        }
    }

    fn invoke(&self, args: A) {
        let callback = lock(&self.callback).clone();
        callback(args);
    }
}

impl<A: Send + 'static> Drop for DebouncedCallback<A> {
    fn drop(&mut self) {
        self.cancel();
    }
}

// =========================================================================
// Debounced Value
// =========================================================================

/// A value that follows its source after the source stops changing
pub struct DebouncedValue<T: Clone + Send + 'static> {
    source: Mutex<T>,
    committed: Arc<Mutex<T>>,
    debouncer: DebouncedCallback<T>,
}

impl<T: Clone + Send + 'static> DebouncedValue<T> {
    pub fn new(ctx: &HookContext, initial: T, delay: Duration) -> Self {
        let committed = Arc::new(Mutex::new(initial.clone()));
        let sink = committed.clone();
        let options = DebounceOptions::with_delay(delay);
        let debouncer = DebouncedCallback::new(ctx, options, move |value: T| {
            *lock(&sink) = value;
        });

        Self {
            source: Mutex::new(initial),
            committed,
            debouncer,
        }
    }

    /// The committed value
    pub fn get(&self) -> T {
        lock(&self.committed).clone()
    }

    /// The latest source value, committed or not
    pub fn source(&self) -> T {
        lock(&self.source).clone()
    }

    /// Change the source; commits after a full quiet period
    pub fn set(&self, value: T) {
        *lock(&self.source) = value.clone();
        self.debouncer.call(value);
    }

    /// Change the quiet period and restart the window with the current source
    pub fn set_delay(&self, delay: Duration) {
        self.debouncer.cancel();
        self.debouncer.set_delay(delay);
        self.debouncer.call(self.source());
    }

    /// Commit the pending source value now
    pub fn flush(&self) {
        self.debouncer.flush();
    }

    /// Drop the pending commit, keeping the committed value
    pub fn cancel(&self) {
        self.debouncer.cancel();
    }

    pub fn is_pending(&self) -> bool {
        self.debouncer.is_pending()
    }
}
