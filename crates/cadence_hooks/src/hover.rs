//! Hover detection with enter/leave delays
//!
//! ```text
//!                 enter (delay)                 delay elapsed
//!   NotHovered ─────────────────▶ PendingEnter ───────────────▶ Hovered
//!        ▲  ◀──────────────────────────┘ leave                 │    ▲
//!        │                                         leave (delay)│    │ enter
//!        └────────────────────── PendingExit ◀─────────────────┘    │
//!              delay elapsed          └─────────────────────────────┘
//! ```
//!
//! Without a delay the pending states are skipped. The element counts as
//! hovered in `Hovered` and `PendingExit`.

use crate::context::HookContext;
use cadence_core::events::event_types::{POINTER_ENTER, POINTER_LEAVE};
use cadence_core::fsm::StateMachine;
use cadence_core::sync::lock;
use cadence_core::{EventDispatcher, ListenerId, TargetId, TimerHandle, TimerService};
use serde::Deserialize;
use smallvec::SmallVec;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

/// Hover delays. Negative values are treated as zero.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HoverOptions {
    pub delay_enter_ms: i64,
    pub delay_leave_ms: i64,
}

impl HoverOptions {
    pub fn delay_enter(&self) -> Duration {
        clamp_delay(self.delay_enter_ms)
    }

    pub fn delay_leave(&self) -> Duration {
        clamp_delay(self.delay_leave_ms)
    }
}

fn clamp_delay(ms: i64) -> Duration {
    Duration::from_millis(ms.max(0).unsigned_abs())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HoverPhase {
    NotHovered,
    PendingEnter,
    Hovered,
    PendingExit,
}

impl HoverPhase {
    pub fn is_hovered(self) -> bool {
        matches!(self, HoverPhase::Hovered | HoverPhase::PendingExit)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum HoverInput {
    Enter,
    EnterDeferred,
    EnterElapsed,
    Leave,
    LeaveDeferred,
    LeaveElapsed,
}

fn hover_machine() -> StateMachine<HoverPhase, HoverInput> {
    use HoverInput::*;
    use HoverPhase::*;

    StateMachine::builder("hover", NotHovered)
        .on(NotHovered, Enter, Hovered)
        .on(NotHovered, EnterDeferred, PendingEnter)
        .on(PendingEnter, EnterElapsed, Hovered)
        .on(PendingEnter, Leave, NotHovered)
        .on(PendingEnter, LeaveDeferred, NotHovered)
        .on(Hovered, Leave, NotHovered)
        .on(Hovered, LeaveDeferred, PendingExit)
        .on(PendingExit, Enter, Hovered)
        .on(PendingExit, EnterDeferred, Hovered)
        .on(PendingExit, LeaveElapsed, NotHovered)
        .build()
}

struct HoverState {
    machine: StateMachine<HoverPhase, HoverInput>,
    options: HoverOptions,
    target: Option<TargetId>,
    listeners: SmallVec<[ListenerId; 2]>,
    enter_timer: Option<TimerHandle>,
    exit_timer: Option<TimerHandle>,
}

struct HoverShared {
    state: Mutex<HoverState>,
    timers: Arc<dyn TimerService>,
    events: Option<Arc<EventDispatcher>>,
}

/// Tracks whether the pointer is over a target
pub struct HoverDetector {
    shared: Arc<HoverShared>,
}

impl HoverDetector {
    /// Attach to `target`. A missing target (or a host without events)
    /// attaches nothing and reports not hovered.
    pub fn new(ctx: &HookContext, target: Option<TargetId>, options: HoverOptions) -> Self {
        let shared = Arc::new(HoverShared {
            state: Mutex::new(HoverState {
                machine: hover_machine(),
                options,
                target: None,
                listeners: SmallVec::new(),
                enter_timer: None,
                exit_timer: None,
            }),
            timers: ctx.timers().clone(),
            events: ctx.events().cloned(),
        });

        {
            let mut state = lock(&shared.state);
            HoverShared::attach(&shared, &mut state, target);
        }

        Self { shared }
    }

    pub fn is_hovered(&self) -> bool {
        self.phase().is_hovered()
    }

    pub fn phase(&self) -> HoverPhase {
        lock(&self.shared.state).machine.current_state()
    }

    pub fn target(&self) -> Option<TargetId> {
        lock(&self.shared.state).target
    }

    /// Move to a new target, dropping all state tied to the old one
    pub fn set_target(&self, target: Option<TargetId>) {
        let mut state = lock(&self.shared.state);
        if state.target == target {
            return;
        }
        self.shared.detach(&mut state);
        HoverShared::attach(&self.shared, &mut state, target);
    }

    /// Replace the delays. A pending transition is re-armed with the new delay.
    pub fn set_options(&self, options: HoverOptions) {
        let mut state = lock(&self.shared.state);
        state.options = options;

        match state.machine.current_state() {
            HoverPhase::PendingEnter => {
                self.shared.cancel_timers(&mut state);
                HoverShared::schedule_enter(&self.shared, &mut state);
            }
            HoverPhase::PendingExit => {
                self.shared.cancel_timers(&mut state);
                HoverShared::schedule_exit(&self.shared, &mut state);
            }
            HoverPhase::NotHovered | HoverPhase::Hovered => {}
        }
    }
}

impl HoverShared {
    fn attach(this: &Arc<Self>, state: &mut HoverState, target: Option<TargetId>) {
        state.target = target;
        let (Some(events), Some(target)) = (this.events.as_ref(), target) else {
            return;
        };

        let weak = Arc::downgrade(this);
        state.listeners.push(events.add_listener(target, POINTER_ENTER, move |_| {
            if let Some(shared) = weak.upgrade() {
                Self::pointer_enter(&shared);
            }
        }));
        let weak = Arc::downgrade(this);
        state.listeners.push(events.add_listener(target, POINTER_LEAVE, move |_| {
            if let Some(shared) = weak.upgrade() {
                Self::pointer_leave(&shared);
            }
        }));

        tracing::debug!(?target, "hover attached");
    }

    fn detach(&self, state: &mut HoverState) {
        self.cancel_timers(state);
        if let Some(events) = &self.events {
            for id in state.listeners.drain(..) {
                events.remove_listener(id);
            }
        }
        state.machine.reset(HoverPhase::NotHovered);
        tracing::debug!(target = ?state.target, "hover detached");
    }

    fn cancel_timers(&self, state: &mut HoverState) {
        for handle in [state.enter_timer.take(), state.exit_timer.take()].into_iter().flatten() {
            self.timers.cancel(handle);
        }
    }

    fn pointer_enter(this: &Arc<Self>) {
        let mut state = lock(&this.state);
        if let Some(handle) = state.exit_timer.take() {
            this.timers.cancel(handle);
        }
        Self::schedule_enter(this, &mut state);
    }

    fn pointer_leave(this: &Arc<Self>) {
        let mut state = lock(&this.state);
        if let Some(handle) = state.enter_timer.take() {
            this.timers.cancel(handle);
        }
        Self::schedule_exit(this, &mut state);
    }

    /// Apply an enter, arming the enter timer when it lands in `PendingEnter`
    fn schedule_enter(this: &Arc<Self>, state: &mut HoverState) {
        let delay = state.options.delay_enter();
        let input = if delay.is_zero() {
            HoverInput::Enter
        } else {
            HoverInput::EnterDeferred
        };

        // Re-arming from PendingEnter (options changed) must not re-send
        let phase = if state.machine.is_in(HoverPhase::PendingEnter) {
            if delay.is_zero() {
                state.machine.send(HoverInput::EnterElapsed)
            } else {
                HoverPhase::PendingEnter
            }
        } else {
            state.machine.send(input)
        };

        if phase == HoverPhase::PendingEnter && state.enter_timer.is_none() {
            let weak = Arc::downgrade(this);
            state.enter_timer = Some(this.timers.schedule_once(
                delay,
                Arc::new(move || Self::on_timer(&weak, HoverInput::EnterElapsed)),
            ));
        }
    }

    /// Apply a leave, arming the exit timer when it lands in `PendingExit`
    fn schedule_exit(this: &Arc<Self>, state: &mut HoverState) {
        let delay = state.options.delay_leave();
        let input = if delay.is_zero() {
            HoverInput::Leave
        } else {
            HoverInput::LeaveDeferred
        };

        let phase = if state.machine.is_in(HoverPhase::PendingExit) {
            if delay.is_zero() {
                state.machine.send(HoverInput::LeaveElapsed)
            } else {
                HoverPhase::PendingExit
            }
        } else {
            state.machine.send(input)
        };

        if phase == HoverPhase::PendingExit && state.exit_timer.is_none() {
            let weak = Arc::downgrade(this);
            state.exit_timer = Some(this.timers.schedule_once(
                delay,
                Arc::new(move || Self::on_timer(&weak, HoverInput::LeaveElapsed)),
            ));
        }
    }

    fn on_timer(weak: &Weak<Self>, input: HoverInput) {
        let Some(shared) = weak.upgrade() else {
            return;
        };
        let mut state = lock(&shared.state);
        match input {
            HoverInput::EnterElapsed => state.enter_timer = None,
            _ => state.exit_timer = None,
        }
        state.machine.send(input);
    }
}

impl Drop for HoverDetector {
    fn drop(&mut self) {
        let mut state = lock(&self.shared.state);
        self.shared.detach(&mut state);
    }
}
