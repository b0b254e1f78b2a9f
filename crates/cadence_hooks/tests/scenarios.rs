//! End-to-end timing scenarios driven by virtual time

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cadence_core::events::event_types::{POINTER_ENTER, POINTER_LEAVE, POINTER_MOVE};
use cadence_core::{Event, EventDispatcher, TargetId, TimerScheduler};
use cadence_hooks::{
    Countdown, CountdownOptions, DebounceOptions, DebouncedCallback, DebouncedValue, HookContext,
    HooksConfig, HoverDetector, HoverOptions, MouseOptions, MousePositionTracker, Position,
};
use pretty_assertions::assert_eq;

fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("cadence_hooks=debug,cadence_core=debug")
        .with_test_writer()
        .try_init();
}

struct Host {
    timers: Arc<TimerScheduler>,
    events: Arc<EventDispatcher>,
    ctx: HookContext,
}

impl Host {
    fn new() -> Self {
        init_tracing();
        let timers = TimerScheduler::shared();
        let events = EventDispatcher::shared();
        let ctx = HookContext::new(timers.clone(), events.clone());
        Self { timers, events, ctx }
    }

    fn pointer(&self, event_type: u32, target: TargetId, x: f32, y: f32) {
        self.events.dispatch(&mut Event::pointer(event_type, target, x, y));
    }
}

#[test]
fn countdown_auto_start_runs_to_zero_and_stays() {
    let host = Host::new();
    let completions = Arc::new(AtomicUsize::new(0));
    let countdown = Countdown::new(
        &host.ctx,
        ms(3000),
        CountdownOptions {
            auto_start: true,
            ..CountdownOptions::default()
        },
    );
    let counter = completions.clone();
    countdown.set_on_complete(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    host.timers.advance(ms(3000));
    assert_eq!(countdown.remaining(), Duration::ZERO);
    assert!(!countdown.is_running());
    assert_eq!(completions.load(Ordering::SeqCst), 1);

    host.timers.advance(ms(1000));
    assert_eq!(countdown.remaining(), Duration::ZERO);
    assert_eq!(completions.load(Ordering::SeqCst), 1);
}

#[test]
fn countdown_elapsed_time_matches_advance() {
    let host = Host::new();
    for elapsed in [0, 1000, 2000, 5000, 7000] {
        let countdown = Countdown::new(&host.ctx, ms(5000), CountdownOptions::default());
        countdown.start();
        host.timers.advance(ms(elapsed));
        assert_eq!(countdown.remaining(), ms(5000u64.saturating_sub(elapsed)));
        countdown.pause();
    }
}

#[test]
fn debounced_callback_delivers_last_arguments_once() {
    let host = Host::new();
    let calls = Arc::new(Mutex::new(Vec::new()));
    let sink = calls.clone();
    let options = DebounceOptions::with_delay(ms(500));
    let debounced = DebouncedCallback::new(&host.ctx, options, move |arg: &'static str| {
        sink.lock().unwrap().push(arg);
    });

    debounced.call("a");
    host.timers.advance(ms(250));
    debounced.call("b");
    host.timers.advance(ms(500));

    assert_eq!(*calls.lock().unwrap(), vec!["b"]);
}

#[test]
fn debounced_callback_burst_coalesces() {
    let host = Host::new();
    let calls = Arc::new(Mutex::new(Vec::new()));
    let sink = calls.clone();
    let options = DebounceOptions::with_delay(ms(100));
    let debounced = DebouncedCallback::new(&host.ctx, options, move |n: u32| {
        sink.lock().unwrap().push(n);
    });

    for n in 0..20 {
        debounced.call(n);
        host.timers.advance(ms(99));
    }
    assert!(calls.lock().unwrap().is_empty());

    host.timers.advance(ms(1));
    assert_eq!(*calls.lock().unwrap(), vec![19]);
}

#[test]
fn debounced_value_commits_end_of_burst() {
    let host = Host::new();
    let value = DebouncedValue::new(&host.ctx, vec![0], ms(200));

    value.set(vec![1]);
    host.timers.advance(ms(100));
    value.set(vec![1, 2]);
    host.timers.advance(ms(100));
    value.set(vec![1, 2, 3]);
    host.timers.advance(ms(199));
    assert_eq!(value.get(), vec![0]);

    host.timers.advance(ms(1));
    assert_eq!(value.get(), vec![1, 2, 3]);
}

#[test]
fn hover_leave_before_enter_delay_never_hovers() {
    let host = Host::new();
    let target = TargetId(7);
    let hover = HoverDetector::new(
        &host.ctx,
        Some(target),
        HoverOptions {
            delay_enter_ms: 200,
            delay_leave_ms: 0,
        },
    );

    host.pointer(POINTER_ENTER, target, 0.0, 0.0);
    host.timers.advance(ms(150));
    assert!(!hover.is_hovered());
    host.pointer(POINTER_LEAVE, target, 0.0, 0.0);
    host.timers.advance(ms(1000));
    assert!(!hover.is_hovered());
    assert_eq!(host.timers.pending_count(), 0);
}

#[test]
fn hover_reenter_keeps_hover_uninterrupted() {
    let host = Host::new();
    let target = TargetId(3);
    let hover = HoverDetector::new(
        &host.ctx,
        Some(target),
        HoverOptions {
            delay_enter_ms: 0,
            delay_leave_ms: 300,
        },
    );

    host.pointer(POINTER_ENTER, target, 0.0, 0.0);
    assert!(hover.is_hovered());
    host.pointer(POINTER_LEAVE, target, 0.0, 0.0);
    host.timers.advance(ms(200));
    assert!(hover.is_hovered());
    host.pointer(POINTER_ENTER, target, 0.0, 0.0);
    host.timers.advance(ms(1000));
    assert!(hover.is_hovered());
}

#[test]
fn mouse_throttle_window() {
    let host = Host::new();
    let tracker = MousePositionTracker::new(
        &host.ctx,
        MouseOptions {
            throttle_ms: Some(100),
            ..MouseOptions::default()
        },
    )
    .unwrap();

    host.pointer(POINTER_MOVE, TargetId::WINDOW, 10.0, 10.0);
    assert_eq!(tracker.position(), Position::new(10.0, 10.0));

    host.timers.advance(ms(50));
    host.pointer(POINTER_MOVE, TargetId::WINDOW, 20.0, 20.0);
    assert_eq!(tracker.position(), Position::new(10.0, 10.0));

    host.timers.advance(ms(50));
    host.pointer(POINTER_MOVE, TargetId::WINDOW, 30.0, 30.0);
    assert_eq!(tracker.position(), Position::new(30.0, 30.0));
}

#[test]
fn hooks_built_from_loaded_config() {
    let host = Host::new();
    let config = HooksConfig::from_toml_str(
        r#"
        [debounce]
        delay_ms = 50

        [mouse]
        debounce_ms = 20
        "#,
    )
    .unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let debounced = DebouncedCallback::new(&host.ctx, config.debounce.clone(), move |_: ()| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    let tracker = MousePositionTracker::new(&host.ctx, config.mouse.clone()).unwrap();

    debounced.call(());
    host.pointer(POINTER_MOVE, TargetId::WINDOW, 4.0, 2.0);
    host.timers.advance(ms(20));
    assert_eq!(tracker.position(), Position::new(4.0, 2.0));
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    host.timers.advance(ms(30));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn unmounting_every_hook_leaves_nothing_behind() {
    let host = Host::new();
    let target = TargetId(1);

    let countdown = Countdown::new(
        &host.ctx,
        ms(1000),
        CountdownOptions {
            auto_start: true,
            ..CountdownOptions::default()
        },
    );
    let debounced = DebouncedCallback::new(&host.ctx, DebounceOptions::default(), |_: u8| {});
    debounced.call(1);
    let value = DebouncedValue::new(&host.ctx, 0, ms(100));
    value.set(1);
    let hover = HoverDetector::new(
        &host.ctx,
        Some(target),
        HoverOptions {
            delay_enter_ms: 100,
            delay_leave_ms: 100,
        },
    );
    host.pointer(POINTER_ENTER, target, 0.0, 0.0);
    let tracker = MousePositionTracker::new(
        &host.ctx,
        MouseOptions {
            debounce_ms: Some(100),
            ..MouseOptions::default()
        },
    )
    .unwrap();
    host.pointer(POINTER_MOVE, TargetId::WINDOW, 1.0, 1.0);

    assert!(host.timers.pending_count() > 0);
    drop((countdown, debounced, value, hover, tracker));

    assert_eq!(host.timers.pending_count(), 0);
    assert_eq!(host.events.listener_count(target, POINTER_ENTER), 0);
    assert_eq!(host.events.listener_count(TargetId::WINDOW, POINTER_MOVE), 0);
    host.timers.advance(ms(5000));
}
