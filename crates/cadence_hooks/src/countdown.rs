//! Countdown timer
//!
//! Tracks remaining time toward zero with start/pause/resume/reset/toggle
//! and a completion callback that fires once per run to zero.
//!
//! ```text
//!            start / resume              tick reaches 0
//!   Idle ─────────────────────▶ Running ───────────────▶ Completed
//!    ▲  ◀─────────────────────    │                         │
//!    │          pause             │                         │
//!    └──────── reset / set_duration ◀───────────────────────┘
//! ```
//!
//! The completion callback is dispatched on a zero-delay timer so the tick
//! that reached zero finishes updating state before user code runs.

use crate::context::HookContext;
use cadence_core::fsm::StateMachine;
use cadence_core::sync::lock;
use cadence_core::{TimerHandle, TimerService};
use serde::Deserialize;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

/// Countdown configuration
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CountdownOptions {
    /// Tick period; each tick removes this much remaining time
    pub interval_ms: u64,
    /// Start running on construction and after every reset
    pub auto_start: bool,
}

impl Default for CountdownOptions {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            auto_start: false,
        }
    }
}

/// Where the countdown is in its lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CountdownPhase {
    Idle,
    Running,
    Completed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CountdownInput {
    Start,
    Pause,
    Finish,
    /// Remaining time set to a non-zero value
    Rearm,
    /// Remaining time set to zero without running
    Drain,
}

type CompleteCallback = Arc<dyn Fn() + Send + Sync>;

struct CountdownState {
    machine: StateMachine<CountdownPhase, CountdownInput>,
    remaining: Duration,
    target: Duration,
    tick: Option<TimerHandle>,
    completion: Option<TimerHandle>,
}

struct CountdownShared {
    state: Mutex<CountdownState>,
    on_complete: Mutex<Option<CompleteCallback>>,
    timers: Arc<dyn TimerService>,
    interval: Duration,
    auto_start: bool,
}

/// A countdown toward zero
pub struct Countdown {
    shared: Arc<CountdownShared>,
}

impl Countdown {
    pub fn new(ctx: &HookContext, duration: Duration, options: CountdownOptions) -> Self {
        let machine = StateMachine::builder("countdown", CountdownPhase::Idle)
            .on(CountdownPhase::Idle, CountdownInput::Start, CountdownPhase::Running)
            .on(CountdownPhase::Running, CountdownInput::Pause, CountdownPhase::Idle)
            .on(CountdownPhase::Running, CountdownInput::Finish, CountdownPhase::Completed)
            .on_any(
                &[CountdownPhase::Idle, CountdownPhase::Running, CountdownPhase::Completed],
                CountdownInput::Rearm,
                CountdownPhase::Idle,
            )
            .on_any(
                &[CountdownPhase::Idle, CountdownPhase::Running, CountdownPhase::Completed],
                CountdownInput::Drain,
                CountdownPhase::Completed,
            )
            .build();

        let shared = Arc::new(CountdownShared {
            state: Mutex::new(CountdownState {
                machine,
                remaining: duration,
                target: duration,
                tick: None,
                completion: None,
            }),
            on_complete: Mutex::new(None),
            timers: ctx.timers().clone(),
            interval: Duration::from_millis(options.interval_ms.max(1)),
            auto_start: options.auto_start,
        });

        {
            let mut state = lock(&shared.state);
            if duration.is_zero() {
                state.machine.send(CountdownInput::Drain);
            } else if shared.auto_start {
                CountdownShared::start_locked(&shared, &mut state);
            }
        }

        tracing::debug!(
            duration_ms = duration.as_millis() as u64,
            interval_ms = shared.interval.as_millis() as u64,
            auto_start = shared.auto_start,
            "countdown mounted"
        );

        Self { shared }
    }

    /// Register the completion callback, replacing any previous one.
    ///
    /// The callback is read when completion fires, so replacing it while a
    /// run is in flight takes effect for that run.
    pub fn set_on_complete<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        *lock(&self.shared.on_complete) = Some(Arc::new(callback));
    }

    /// Start counting down. No-op when already running or at zero.
    pub fn start(&self) {
        let mut state = lock(&self.shared.state);
        CountdownShared::start_locked(&self.shared, &mut state);
    }

    /// Stop counting, keeping the remaining time
    pub fn pause(&self) {
        let mut state = lock(&self.shared.state);
        self.shared.pause_locked(&mut state);
    }

    /// Continue from the remaining time; same rules as [`start`](Self::start)
    pub fn resume(&self) {
        self.start();
    }

    /// Restore the remaining time to the current target duration
    pub fn reset(&self) {
        let mut state = lock(&self.shared.state);
        self.shared.cancel_tick(&mut state);
        state.remaining = state.target;
        self.shared.rearm(&mut state);

        if self.shared.auto_start {
            CountdownShared::start_locked(&self.shared, &mut state);
        }
    }

    /// Pause when running, otherwise start. No-op at zero.
    pub fn toggle(&self) {
        let mut state = lock(&self.shared.state);
        if state.machine.is_in(CountdownPhase::Running) {
            self.shared.pause_locked(&mut state);
        } else {
            CountdownShared::start_locked(&self.shared, &mut state);
        }
    }

    /// Pause and replace both the remaining time and the reset target
    pub fn set_duration(&self, duration: Duration) {
        let mut state = lock(&self.shared.state);
        self.shared.cancel_tick(&mut state);
        state.remaining = duration;
        state.target = duration;
        self.shared.rearm(&mut state);
    }

    pub fn remaining(&self) -> Duration {
        lock(&self.shared.state).remaining
    }

    pub fn is_running(&self) -> bool {
        lock(&self.shared.state).machine.is_in(CountdownPhase::Running)
    }

    pub fn phase(&self) -> CountdownPhase {
        lock(&self.shared.state).machine.current_state()
    }

    /// The duration [`reset`](Self::reset) restores
    pub fn target(&self) -> Duration {
        lock(&self.shared.state).target
    }

    /// Fraction of the target elapsed, in `0.0..=1.0`
    pub fn progress(&self) -> f32 {
        let state = lock(&self.shared.state);
        if state.target.is_zero() {
            return 1.0;
        }
        1.0 - state.remaining.as_secs_f32() / state.target.as_secs_f32()
    }
}

impl CountdownShared {
    fn start_locked(this: &Arc<Self>, state: &mut CountdownState) {
        if state.remaining.is_zero() || state.machine.is_in(CountdownPhase::Running) {
            return;
        }

        let weak: Weak<Self> = Arc::downgrade(this);
        let handle = this.timers.schedule_repeating(
            this.interval,
            Arc::new(move || {
                if let Some(shared) = weak.upgrade() {
                    Self::on_tick(&shared);
                }
            }),
        );
        state.tick = Some(handle);
        state.machine.send(CountdownInput::Start);
    }

    fn pause_locked(&self, state: &mut CountdownState) {
        if !state.machine.is_in(CountdownPhase::Running) {
            return;
        }
        self.cancel_tick(state);
        state.machine.send(CountdownInput::Pause);
    }

    fn cancel_tick(&self, state: &mut CountdownState) {
        if let Some(handle) = state.tick.take() {
            self.timers.cancel(handle);
        }
    }

    /// Move to Idle or Completed to match a freshly assigned remaining time
    fn rearm(&self, state: &mut CountdownState) {
        let input = if state.remaining.is_zero() {
            CountdownInput::Drain
        } else {
            CountdownInput::Rearm
        };
        state.machine.send(input);
    }

    fn on_tick(this: &Arc<Self>) {
        let mut state = lock(&this.state);
        if !state.machine.is_in(CountdownPhase::Running) {
            return;
        }

        state.remaining = state.remaining.saturating_sub(this.interval);
        tracing::trace!(remaining_ms = state.remaining.as_millis() as u64, "countdown tick");

        if !state.remaining.is_zero() {
            return;
        }

        this.cancel_tick(&mut state);
        state.machine.send(CountdownInput::Finish);

        let weak = Arc::downgrade(this);
        let handle = this.timers.schedule_once(
            Duration::ZERO,
            Arc::new(move || {
                if let Some(shared) = weak.upgrade() {
                    shared.fire_complete();
                }
            }),
        );
        state.completion = Some(handle);
    }

    fn fire_complete(&self) {
        lock(&self.state).completion = None;
        let callback = lock(&self.on_complete).clone();

        tracing::debug!("countdown complete");
        if let Some(callback) = callback {
            callback();
        }
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        let mut state = lock(&self.shared.state);
        self.shared.cancel_tick(&mut state);
        if let Some(handle) = state.completion.take() {
            self.shared.timers.cancel(handle);
        }
        tracing::debug!("countdown unmounted");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::TimerScheduler;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn setup(duration: u64, options: CountdownOptions) -> (Arc<TimerScheduler>, Countdown) {
        let timers = TimerScheduler::shared();
        let ctx = HookContext::headless(timers.clone());
        let countdown = Countdown::new(&ctx, ms(duration), options);
        (timers, countdown)
    }

    fn auto_start() -> CountdownOptions {
        CountdownOptions {
            auto_start: true,
            ..CountdownOptions::default()
        }
    }

    fn completion_counter(countdown: &Countdown) -> Arc<AtomicU32> {
        let count = Arc::new(AtomicU32::new(0));
        let clone = count.clone();
        countdown.set_on_complete(move || {
            clone.fetch_add(1, Ordering::SeqCst);
        });
        count
    }

    #[test]
    fn test_idle_until_started() {
        let (timers, countdown) = setup(3000, CountdownOptions::default());
        assert_eq!(countdown.phase(), CountdownPhase::Idle);

        timers.advance(ms(2000));
        assert_eq!(countdown.remaining(), ms(3000));

        countdown.start();
        timers.advance(ms(1000));
        assert_eq!(countdown.remaining(), ms(2000));
        assert!(countdown.is_running());
    }

    #[test]
    fn test_runs_to_zero_and_completes_once() {
        let (timers, countdown) = setup(3000, auto_start());
        let completions = completion_counter(&countdown);

        timers.advance(ms(3000));
        assert_eq!(countdown.remaining(), Duration::ZERO);
        assert!(!countdown.is_running());
        assert_eq!(countdown.phase(), CountdownPhase::Completed);
        assert_eq!(completions.load(Ordering::SeqCst), 1);

        timers.advance(ms(1000));
        assert_eq!(countdown.remaining(), Duration::ZERO);
        assert_eq!(completions.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_remaining_is_clamped_at_zero() {
        let (timers, countdown) = setup(2500, auto_start());

        timers.advance(ms(3000));
        assert_eq!(countdown.remaining(), Duration::ZERO);
        assert_eq!(timers.pending_count(), 0);
    }

    #[test]
    fn test_pause_keeps_remaining_and_resume_continues() {
        let (timers, countdown) = setup(5000, auto_start());

        timers.advance(ms(2000));
        countdown.pause();
        assert!(!countdown.is_running());

        timers.advance(ms(5000));
        assert_eq!(countdown.remaining(), ms(3000));

        countdown.resume();
        timers.advance(ms(1000));
        assert_eq!(countdown.remaining(), ms(2000));
    }

    #[test]
    fn test_start_twice_does_not_double_tick() {
        let (timers, countdown) = setup(5000, CountdownOptions::default());
        countdown.start();
        countdown.start();

        timers.advance(ms(1000));
        assert_eq!(countdown.remaining(), ms(4000));
    }

    #[test]
    fn test_start_at_zero_is_noop() {
        let (timers, countdown) = setup(0, CountdownOptions::default());
        let completions = completion_counter(&countdown);

        countdown.start();
        countdown.toggle();
        assert!(!countdown.is_running());
        assert_eq!(countdown.phase(), CountdownPhase::Completed);

        timers.advance(ms(1000));
        assert_eq!(completions.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_toggle() {
        let (timers, countdown) = setup(3000, CountdownOptions::default());

        countdown.toggle();
        assert!(countdown.is_running());
        timers.advance(ms(1000));

        countdown.toggle();
        assert!(!countdown.is_running());
        timers.advance(ms(1000));
        assert_eq!(countdown.remaining(), ms(2000));
    }

    #[test]
    fn test_reset_restores_target_and_honors_auto_start() {
        let (timers, countdown) = setup(3000, CountdownOptions::default());
        countdown.start();
        timers.advance(ms(2000));

        countdown.reset();
        assert_eq!(countdown.remaining(), ms(3000));
        assert!(!countdown.is_running());

        let (timers, countdown) = setup(3000, auto_start());
        timers.advance(ms(3000));
        countdown.reset();
        assert!(countdown.is_running());
        timers.advance(ms(1000));
        assert_eq!(countdown.remaining(), ms(2000));
    }

    #[test]
    fn test_set_duration_pauses_and_becomes_reset_target() {
        let (timers, countdown) = setup(3000, auto_start());
        timers.advance(ms(1000));

        countdown.set_duration(ms(10_000));
        assert!(!countdown.is_running());
        assert_eq!(countdown.remaining(), ms(10_000));
        assert_eq!(countdown.target(), ms(10_000));

        countdown.start();
        timers.advance(ms(4000));
        countdown.reset();
        assert_eq!(countdown.remaining(), ms(10_000));
    }

    #[test]
    fn test_latest_completion_callback_is_used() {
        let (timers, countdown) = setup(1000, auto_start());
        let first = completion_counter(&countdown);

        timers.advance(ms(500));
        let second = completion_counter(&countdown);
        timers.advance(ms(500));

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_completion_is_deferred_past_the_tick() {
        let (timers, countdown) = setup(1000, auto_start());
        let countdown = Arc::new(countdown);

        let observed = Arc::new(Mutex::new(None));
        let log = observed.clone();
        let weak = Arc::downgrade(&countdown);
        countdown.set_on_complete(move || {
            if let Some(countdown) = weak.upgrade() {
                *log.lock().unwrap() = Some((countdown.remaining(), countdown.is_running()));
            }
        });

        timers.advance(ms(1000));
        assert_eq!(*observed.lock().unwrap(), Some((Duration::ZERO, false)));
    }

    #[test]
    fn test_drop_cancels_running_tick() {
        let (timers, countdown) = setup(1000, auto_start());
        let completions = completion_counter(&countdown);
        assert_eq!(timers.pending_count(), 1);

        drop(countdown);
        assert_eq!(timers.pending_count(), 0);

        timers.advance(ms(5000));
        assert_eq!(completions.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_drop_cancels_queued_completion() {
        let (timers, countdown) = setup(1000, auto_start());
        let completions = completion_counter(&countdown);
        let slot = Arc::new(Mutex::new(Some(countdown)));

        // Same deadline as the final tick, scheduled later, so it runs
        // after the tick has queued the completion
        let pending_at_drop = Arc::new(Mutex::new(None));
        let owner = slot.clone();
        let observed = pending_at_drop.clone();
        let observer = timers.clone();
        timers.schedule_once(
            ms(1000),
            Arc::new(move || {
                *observed.lock().unwrap() = Some(observer.pending_count());
                drop(owner.lock().unwrap().take());
            }),
        );

        timers.advance(ms(1000));
        assert_eq!(*pending_at_drop.lock().unwrap(), Some(1));
        assert!(slot.lock().unwrap().is_none());
        assert_eq!(completions.load(Ordering::SeqCst), 0);
        assert_eq!(timers.pending_count(), 0);

        timers.advance(ms(5000));
        assert_eq!(completions.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_progress() {
        let (timers, countdown) = setup(4000, auto_start());
        assert_eq!(countdown.progress(), 0.0);

        timers.advance(ms(1000));
        assert!((countdown.progress() - 0.25).abs() < f32::EPSILON);
    }
}
