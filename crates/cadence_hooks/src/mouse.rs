//! Pointer position tracking
//!
//! Follows pointer-move events on the window under one of three policies:
//! every move ([`MousePolicy::Immediate`]), the last move of a burst
//! ([`MousePolicy::Debounce`]), or the first move of each window
//! ([`MousePolicy::Throttle`], leading edge only).

use crate::context::HookContext;
use cadence_core::error::{ConfigError, ConfigResult};
use cadence_core::events::event_types::POINTER_MOVE;
use cadence_core::sync::lock;
use cadence_core::{EventData, EventDispatcher, ListenerId, TargetId, TimerHandle, TimerService};
use serde::Deserialize;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

/// A pointer position in window coordinates
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// How move events are gated before they update the position
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MousePolicy {
    #[default]
    Immediate,
    Debounce(Duration),
    Throttle(Duration),
}

impl MousePolicy {
    /// Debounce by `period`; a zero period is immediate
    pub fn debounce(period: Duration) -> Self {
        if period.is_zero() {
            Self::Immediate
        } else {
            Self::Debounce(period)
        }
    }

    /// Throttle by `period`; a zero period is immediate
    pub fn throttle(period: Duration) -> Self {
        if period.is_zero() {
            Self::Immediate
        } else {
            Self::Throttle(period)
        }
    }
}

/// Tracker configuration as a caller writes it
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct MouseOptions {
    pub debounce_ms: Option<u64>,
    pub throttle_ms: Option<u64>,
    /// Listen for moves at all
    pub enabled: bool,
    /// Position reported before the first tracked move
    pub initial_position: Option<Position>,
}

impl Default for MouseOptions {
    fn default() -> Self {
        Self {
            debounce_ms: None,
            throttle_ms: None,
            enabled: true,
            initial_position: None,
        }
    }
}

impl MouseOptions {
    /// Resolve the gating policy; debounce and throttle together are rejected
    pub fn policy(&self) -> ConfigResult<MousePolicy> {
        MousePolicy::try_from(self)
    }
}

impl TryFrom<&MouseOptions> for MousePolicy {
    type Error = ConfigError;

    fn try_from(options: &MouseOptions) -> Result<Self, Self::Error> {
        match (options.debounce_ms, options.throttle_ms) {
            (Some(debounce_ms), Some(throttle_ms)) => Err(ConfigError::ConflictingPolicy {
                debounce_ms,
                throttle_ms,
            }),
            (Some(ms), None) => Ok(Self::debounce(Duration::from_millis(ms))),
            (None, Some(ms)) => Ok(Self::throttle(Duration::from_millis(ms))),
            (None, None) => Ok(Self::Immediate),
        }
    }
}

struct MouseState {
    position: Position,
    enabled: bool,
    listener: Option<ListenerId>,
    /// Debounce: the move waiting for its quiet period
    pending: Option<Position>,
    debounce_timer: Option<TimerHandle>,
    /// Throttle: when the current window opened
    last_emit: Option<Duration>,
}

struct MouseShared {
    state: Mutex<MouseState>,
    policy: MousePolicy,
    timers: Arc<dyn TimerService>,
    events: Option<Arc<EventDispatcher>>,
}

/// Tracks the pointer position over the whole window
pub struct MousePositionTracker {
    shared: Arc<MouseShared>,
}

impl MousePositionTracker {
    /// Mount a tracker. Fails when both debounce and throttle are configured.
    pub fn new(ctx: &HookContext, options: MouseOptions) -> ConfigResult<Self> {
        let policy = options.policy()?;
        Ok(Self::with_policy(
            ctx,
            policy,
            options.enabled,
            options.initial_position.unwrap_or_default(),
        ))
    }

    /// Mount a tracker from an already resolved policy
    pub fn with_policy(
        ctx: &HookContext,
        policy: MousePolicy,
        enabled: bool,
        initial: Position,
    ) -> Self {
        let policy = match policy {
            MousePolicy::Debounce(period) => MousePolicy::debounce(period),
            MousePolicy::Throttle(period) => MousePolicy::throttle(period),
            MousePolicy::Immediate => MousePolicy::Immediate,
        };

        let shared = Arc::new(MouseShared {
            state: Mutex::new(MouseState {
                position: initial,
                enabled: false,
                listener: None,
                pending: None,
                debounce_timer: None,
                last_emit: None,
            }),
            policy,
            timers: ctx.timers().clone(),
            events: ctx.events().cloned(),
        });

        let tracker = Self { shared };
        tracker.set_enabled(enabled);
        tracing::debug!(?policy, enabled, "mouse tracker mounted");
        tracker
    }

    pub fn position(&self) -> Position {
        lock(&self.shared.state).position
    }

    pub fn policy(&self) -> MousePolicy {
        self.shared.policy
    }

    pub fn is_enabled(&self) -> bool {
        lock(&self.shared.state).enabled
    }

    /// Start or stop listening. The last known position is kept while disabled.
    pub fn set_enabled(&self, enabled: bool) {
        let mut state = lock(&self.shared.state);
        if state.enabled == enabled {
            return;
        }
        state.enabled = enabled;

        if enabled {
            MouseShared::attach(&self.shared, &mut state);
        } else {
            self.shared.detach(&mut state);
        }
    }
}

impl MouseShared {
    fn attach(this: &Arc<Self>, state: &mut MouseState) {
        let Some(events) = &this.events else {
            return;
        };

        let weak: Weak<Self> = Arc::downgrade(this);
        state.listener = Some(events.add_listener(TargetId::WINDOW, POINTER_MOVE, move |event| {
            let EventData::Pointer { x, y } = event.data else {
                return;
            };
            if let Some(shared) = weak.upgrade() {
                Self::on_move(&shared, Position::new(x, y));
            }
        }));
        state.last_emit = None;
        tracing::debug!("mouse tracker listening");
    }

    fn detach(&self, state: &mut MouseState) {
        if let (Some(events), Some(id)) = (&self.events, state.listener.take()) {
            events.remove_listener(id);
            tracing::debug!("mouse tracker stopped listening");
        }
        if let Some(handle) = state.debounce_timer.take() {
            self.timers.cancel(handle);
        }
        state.pending = None;
    }

    fn on_move(this: &Arc<Self>, position: Position) {
        let mut state = lock(&this.state);
        match this.policy {
            MousePolicy::Immediate => state.position = position,
            MousePolicy::Debounce(period) => {
                state.pending = Some(position);
                if let Some(handle) = state.debounce_timer.take() {
                    this.timers.cancel(handle);
                }
                let weak = Arc::downgrade(this);
                state.debounce_timer = Some(this.timers.schedule_once(
                    period,
                    Arc::new(move || {
                        if let Some(shared) = weak.upgrade() {
                            shared.commit_pending();
                        }
                    }),
                ));
            }
            MousePolicy::Throttle(period) => {
                let now = this.timers.now();
                let window_open = state
                    .last_emit
                    .map_or(true, |opened| now.saturating_sub(opened) >= period);
                if window_open {
                    state.position = position;
                    state.last_emit = Some(now);
                } else {
                    tracing::trace!(?position, "move throttled");
                }
            }
        }
    }

    fn commit_pending(&self) {
        let mut state = lock(&self.state);
        state.debounce_timer = None;
        if let Some(position) = state.pending.take() {
            state.position = position;
        }
    }
}

impl Drop for MousePositionTracker {
    fn drop(&mut self) {
        let mut state = lock(&self.shared.state);
        self.shared.detach(&mut state);
    }
}
