//! Timer scheduler
//!
//! One-shot and repeating timers with cancellation by handle. The scheduler
//! keeps its own notion of "now" and is driven either by the host frame loop
//! ([`TimerScheduler::tick`]) or explicitly in virtual time
//! ([`TimerScheduler::advance`]), which is how every hook is tested.

use crate::sync::lock;
use slotmap::{new_key_type, SlotMap};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

new_key_type! {
    /// Handle to a scheduled timer
    pub struct TimerHandle;
}

/// Callback invoked when a timer fires
pub type TimerCallback = Arc<dyn Fn() + Send + Sync>;

/// Repeating timers never fire more often than this
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Schedule-once and schedule-repeating primitives with cancellation.
///
/// Implementations must never invoke a callback while holding an internal
/// lock, so callbacks are free to schedule and cancel other timers.
pub trait TimerService: Send + Sync {
    /// Current time of this service, measured from its origin
    fn now(&self) -> Duration;

    /// Run `callback` once after `delay`
    fn schedule_once(&self, delay: Duration, callback: TimerCallback) -> TimerHandle;

    /// Run `callback` every `interval`, first firing one interval from now
    fn schedule_repeating(&self, interval: Duration, callback: TimerCallback) -> TimerHandle;

    /// Cancel a timer. Returns `false` if it already fired or was cancelled.
    fn cancel(&self, handle: TimerHandle) -> bool;

    /// Check whether a timer is still waiting to fire
    fn is_scheduled(&self, handle: TimerHandle) -> bool;
}

struct TimerEntry {
    deadline: Duration,
    interval: Option<Duration>,
    /// Scheduling order, breaks ties between equal deadlines
    seq: u64,
    callback: TimerCallback,
}

struct SchedulerInner {
    now: Duration,
    timers: SlotMap<TimerHandle, TimerEntry>,
    next_seq: u64,
}

impl SchedulerInner {
    fn insert(
        &mut self,
        deadline: Duration,
        interval: Option<Duration>,
        callback: TimerCallback,
    ) -> TimerHandle {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.timers.insert(TimerEntry {
            deadline,
            interval,
            seq,
            callback,
        })
    }

    /// Earliest timer due at or before `limit`
    fn next_due(&self, limit: Duration) -> Option<TimerHandle> {
        self.timers
            .iter()
            .filter(|(_, entry)| entry.deadline <= limit)
            .min_by_key(|(_, entry)| (entry.deadline, entry.seq))
            .map(|(handle, _)| handle)
    }
}

/// The timer scheduler that fires due callbacks as time advances
pub struct TimerScheduler {
    inner: Mutex<SchedulerInner>,
    origin: Instant,
}

impl TimerScheduler {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(SchedulerInner {
                now: Duration::ZERO,
                timers: SlotMap::with_key(),
                next_seq: 0,
            }),
            origin: Instant::now(),
        }
    }

    /// Create a scheduler ready to be shared between hooks
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Advance virtual time by `by`, firing every timer that comes due.
    ///
    /// Timers fire in deadline order and the clock is moved to each deadline
    /// before its callback runs, so timers armed from inside a callback are
    /// measured from the instant that callback fired.
    pub fn advance(&self, by: Duration) {
        let target = lock(&self.inner).now + by;
        self.advance_to(target);
    }

    /// Advance to the wall-clock time elapsed since this scheduler was created.
    ///
    /// Hosts call this once per frame. Time never moves backwards, so mixing
    /// `tick` with `advance` only ever fires timers early, never twice.
    pub fn tick(&self) {
        self.advance_to(self.origin.elapsed());
    }

    /// Fire timers that are already due without moving time forward
    pub fn run_pending(&self) {
        let now = lock(&self.inner).now;
        self.advance_to(now);
    }

    /// Number of timers waiting to fire
    pub fn pending_count(&self) -> usize {
        lock(&self.inner).timers.len()
    }

    fn advance_to(&self, target: Duration) {
        loop {
            let callback = {
                let mut guard = lock(&self.inner);
                let inner = &mut *guard;

                let Some(handle) = inner.next_due(target) else {
                    inner.now = inner.now.max(target);
                    break;
                };

                let seq = inner.next_seq;
                let entry = &mut inner.timers[handle];
                let deadline = entry.deadline;
                let callback = entry.callback.clone();

                let repeating = match entry.interval {
                    Some(interval) => {
                        entry.deadline = deadline + interval;
                        entry.seq = seq;
                        true
                    }
                    None => false,
                };

                if repeating {
                    inner.next_seq += 1;
                } else {
                    inner.timers.remove(handle);
                }
                inner.now = inner.now.max(deadline);

                tracing::trace!(?handle, at_ms = deadline.as_millis() as u64, "timer fired");
                callback
            };

            callback();
        }
    }
}

impl TimerService for TimerScheduler {
    fn now(&self) -> Duration {
        lock(&self.inner).now
    }

    fn schedule_once(&self, delay: Duration, callback: TimerCallback) -> TimerHandle {
        let mut inner = lock(&self.inner);
        let deadline = inner.now + delay;
        inner.insert(deadline, None, callback)
    }

    fn schedule_repeating(&self, interval: Duration, callback: TimerCallback) -> TimerHandle {
        let interval = interval.max(MIN_INTERVAL);
        let mut inner = lock(&self.inner);
        let deadline = inner.now + interval;
        inner.insert(deadline, Some(interval), callback)
    }

    fn cancel(&self, handle: TimerHandle) -> bool {
        lock(&self.inner).timers.remove(handle).is_some()
    }

    fn is_scheduled(&self, handle: TimerHandle) -> bool {
        lock(&self.inner).timers.contains_key(handle)
    }
}

impl Default for TimerScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn counter() -> (Arc<AtomicU32>, TimerCallback) {
        let count = Arc::new(AtomicU32::new(0));
        let clone = count.clone();
        let callback: TimerCallback = Arc::new(move || {
            clone.fetch_add(1, Ordering::SeqCst);
        });
        (count, callback)
    }

    #[test]
    fn test_once_fires_at_deadline() {
        let timers = TimerScheduler::new();
        let (count, callback) = counter();
        let handle = timers.schedule_once(ms(500), callback);

        timers.advance(ms(499));
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(timers.is_scheduled(handle));

        timers.advance(ms(1));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!timers.is_scheduled(handle));

        timers.advance(ms(10_000));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(timers.now(), ms(10_500));
    }

    #[test]
    fn test_repeating_fires_every_interval() {
        let timers = TimerScheduler::new();
        let (count, callback) = counter();
        let handle = timers.schedule_repeating(ms(100), callback);

        timers.advance(ms(350));
        assert_eq!(count.load(Ordering::SeqCst), 3);

        assert!(timers.cancel(handle));
        timers.advance(ms(1000));
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let timers = TimerScheduler::new();
        let (count, callback) = counter();
        let handle = timers.schedule_once(ms(10), callback);

        assert!(timers.cancel(handle));
        assert!(!timers.cancel(handle));

        timers.advance(ms(20));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_stale_handle_does_not_cancel_new_timer() {
        let timers = TimerScheduler::new();
        let (_, first) = counter();
        let (count, second) = counter();

        let stale = timers.schedule_once(ms(10), first);
        timers.advance(ms(10));

        // Slot is reused, but the generation differs
        let fresh = timers.schedule_once(ms(10), second);
        assert!(!timers.cancel(stale));
        assert!(timers.is_scheduled(fresh));

        timers.advance(ms(10));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_nested_schedule_measured_from_fire_time() {
        let timers = TimerScheduler::shared();
        let fired_at = Arc::new(Mutex::new(Vec::new()));

        let outer_timers = timers.clone();
        let outer_log = fired_at.clone();
        timers.schedule_once(
            ms(100),
            Arc::new(move || {
                outer_log.lock().unwrap().push(outer_timers.now());
                let inner_timers = outer_timers.clone();
                let inner_log = outer_log.clone();
                outer_timers.schedule_once(
                    ms(50),
                    Arc::new(move || {
                        inner_log.lock().unwrap().push(inner_timers.now());
                    }),
                );
            }),
        );

        timers.advance(ms(1000));
        assert_eq!(*fired_at.lock().unwrap(), vec![ms(100), ms(150)]);
    }

    #[test]
    fn test_equal_deadlines_fire_in_schedule_order() {
        let timers = TimerScheduler::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for id in 0..3 {
            let log = order.clone();
            timers.schedule_once(ms(10), Arc::new(move || log.lock().unwrap().push(id)));
        }

        timers.advance(ms(10));
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_zero_delay_runs_on_run_pending() {
        let timers = TimerScheduler::new();
        let (count, callback) = counter();
        timers.schedule_once(Duration::ZERO, callback);

        assert_eq!(count.load(Ordering::SeqCst), 0);
        timers.run_pending();
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(timers.now(), Duration::ZERO);
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let timers = TimerScheduler::new();
        let (count, callback) = counter();
        timers.schedule_repeating(Duration::ZERO, callback);

        timers.advance(ms(5));
        assert_eq!(count.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_callback_can_cancel_its_own_repeating_timer() {
        let timers = TimerScheduler::shared();
        let count = Arc::new(AtomicU32::new(0));
        let handle_slot: Arc<Mutex<Option<TimerHandle>>> = Arc::new(Mutex::new(None));

        let timers_clone = timers.clone();
        let count_clone = count.clone();
        let slot_clone = handle_slot.clone();
        let handle = timers.schedule_repeating(
            ms(10),
            Arc::new(move || {
                if count_clone.fetch_add(1, Ordering::SeqCst) == 1 {
                    if let Some(handle) = *slot_clone.lock().unwrap() {
                        timers_clone.cancel(handle);
                    }
                }
            }),
        );
        *handle_slot.lock().unwrap() = Some(handle);

        timers.advance(ms(100));
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert_eq!(timers.pending_count(), 0);
    }

    #[test]
    fn test_tick_never_moves_time_backwards() {
        let timers = TimerScheduler::new();
        timers.advance(Duration::from_secs(3600));

        timers.tick();
        assert_eq!(timers.now(), Duration::from_secs(3600));
    }

    #[test]
    fn test_tick_fires_timers_due_on_the_wall_clock() {
        let timers = TimerScheduler::new();
        let (count, callback) = counter();
        timers.schedule_once(ms(1), callback);

        std::thread::sleep(ms(5));
        timers.tick();

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(timers.now() >= ms(1));
    }
}
