//! Integration tests: end-to-end press/poll sequences using the stub service
//! and mock GPIO.
//!
//! These exercise the public API the way the daemon does: the loop owns the
//! service, LED and button; the test plays the part of the user and of other
//! actors changing Pi-hole behind the daemon's back.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use holeswitch_lib::event_loop::{LoopEvent, ReconciliationLoop};
use holeswitch_lib::gpio::mock::{MockButton, MockLed};
use holeswitch_lib::reconcile::Transition;
use holeswitch_lib::service::ServiceState::{Disabled, Enabled};
use holeswitch_lib::service::stub::StubService;

const DEBOUNCE: Duration = Duration::from_millis(300);

// ── Probe-failure log capture ──

/// Counts probe-failure warnings emitted on the thread named `CAPTURE_THREAD`.
struct ProbeFailureCounter;

static CAPTURE_THREAD: Mutex<Option<String>> = Mutex::new(None);
static PROBE_FAILURES: AtomicUsize = AtomicUsize::new(0);
static LOGGER: ProbeFailureCounter = ProbeFailureCounter;

impl log::Log for ProbeFailureCounter {
    fn enabled(&self, _: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        let current = thread::current().name().map(str::to_string);
        let capture = CAPTURE_THREAD.lock().unwrap().clone();
        if current.is_some()
            && current == capture
            && record.level() == log::Level::Warn
            && record.args().to_string().contains("status probe failed")
        {
            PROBE_FAILURES.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn flush(&self) {}
}

fn capture_probe_failures() {
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(log::LevelFilter::Warn);
    *CAPTURE_THREAD.lock().unwrap() = thread::current().name().map(str::to_string);
    PROBE_FAILURES.store(0, Ordering::SeqCst);
}

fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    cond()
}

// ── Test: the full user story, step by step ──

#[test]
fn press_external_change_and_failing_probe() {
    capture_probe_failures();

    let svc = StubService::new(Disabled);
    let led = MockLed::new();
    let button = MockButton::new(DEBOUNCE);
    let (mut lp, initial) = ReconciliationLoop::start(
        svc.clone(),
        led.clone(),
        button.clone(),
        Duration::from_secs(1),
    )
    .unwrap();

    // 1. Disabled at startup → LED off
    assert_eq!(initial, Transition::Initial(Disabled));
    assert_eq!(led.current(), Some(false));

    // 2. Press → Enabled → LED on
    let t0 = Instant::now();
    button.press_at(t0);
    lp.drain_events(|_| {});
    assert_eq!(svc.actual(), Enabled);
    assert!(led.is_on());

    // 3. Disabled from the web UI → next poll turns the LED off
    svc.set_external(Disabled);
    assert_eq!(
        lp.poll_tick(),
        Some(Transition::External {
            from: Enabled,
            to: Disabled
        })
    );
    assert!(!led.is_on());

    // 4. Press while the status probe fails → command attempted, LED stays off
    svc.fail_queries(true);
    let commands_before = svc.commands().len();
    button.press_at(t0 + Duration::from_secs(2));
    let mut seen = Vec::new();
    lp.drain_events(|t| seen.push(*t));
    assert_eq!(svc.commands().len(), commands_before + 1);
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].state(), Disabled);
    assert!(!led.is_on());
    assert_eq!(lp.last_known(), Disabled);
    // One warning per failed probe: before and after the command
    assert_eq!(PROBE_FAILURES.load(Ordering::SeqCst), 2);

    lp.shutdown();
    assert_eq!(led.current(), Some(false));
    assert!(!button.is_armed());
}

// ── Test: debounce idempotence ──

#[test]
fn two_presses_within_debounce_window_toggle_once() {
    let svc = StubService::new(Enabled);
    let led = MockLed::new();
    let button = MockButton::new(DEBOUNCE);
    let (mut lp, _) =
        ReconciliationLoop::start(svc.clone(), led.clone(), button.clone(), Duration::from_secs(1))
            .unwrap();

    let t0 = Instant::now();
    button.press_at(t0);
    button.press_at(t0 + Duration::from_millis(120));
    lp.drain_events(|_| {});

    assert_eq!(svc.commands(), vec![false]);
    assert_eq!(svc.actual(), Disabled);
    assert!(!led.is_on());
}

// ── Test: self-correction when the command silently fails ──

#[test]
fn silently_failing_command_keeps_original_state() {
    let svc = StubService::new(Enabled);
    svc.ignore_commands(true);
    let led = MockLed::new();
    let button = MockButton::new(DEBOUNCE);
    let (mut lp, _) =
        ReconciliationLoop::start(svc.clone(), led.clone(), button.clone(), Duration::from_secs(1))
            .unwrap();

    button.press();
    let mut seen = Vec::new();
    lp.drain_events(|t| seen.push(*t));

    assert_eq!(
        seen,
        vec![Transition::Toggled {
            from: Enabled,
            requested: Disabled,
            observed: Enabled
        }]
    );
    assert!(led.is_on());
    assert_eq!(lp.last_known(), Enabled);
}

// ── Test: LED never shows a state that was never true ──

#[test]
fn every_led_write_matches_an_observed_state() {
    let svc = StubService::new(Disabled);
    let led = MockLed::new();
    let button = MockButton::new(Duration::ZERO);
    let (mut lp, _) =
        ReconciliationLoop::start(svc.clone(), led.clone(), button.clone(), Duration::from_secs(1))
            .unwrap();

    let mut observed = vec![Disabled];
    for i in 0..20 {
        if i % 3 == 0 {
            svc.set_external(if i % 2 == 0 { Enabled } else { Disabled });
        }
        if i % 4 == 1 {
            svc.ignore_commands(true);
        } else {
            svc.ignore_commands(false);
        }
        button.press();
        if let Some(t) = lp.poll_tick() {
            observed.push(t.state());
        }
        lp.drain_events(|t| observed.push(t.state()));
        assert_eq!(led.is_on(), svc.actual().is_enabled(), "iteration {i}");
    }

    let writes = led.writes();
    let expected: Vec<bool> = observed.iter().map(|s| s.is_enabled()).collect();
    assert_eq!(writes, expected);
}

// ── Test: the loop running on its own thread ──

#[test]
fn running_loop_converges_and_shuts_down() {
    let svc = StubService::new(Disabled);
    let led = MockLed::new();
    let button = MockButton::new(DEBOUNCE);
    let (mut lp, _) = ReconciliationLoop::start(
        svc.clone(),
        led.clone(),
        button.clone(),
        Duration::from_millis(50),
    )
    .unwrap();
    let tx = lp.sender();

    let worker = thread::spawn(move || {
        let mut transitions = Vec::new();
        lp.run(|t| transitions.push(*t));
        lp.shutdown();
        transitions
    });

    // Press from the "interrupt" thread
    button.press();
    assert!(wait_until(Duration::from_secs(2), || led.is_on()));

    // External change converges within a poll interval or so
    svc.set_external(Disabled);
    assert!(wait_until(Duration::from_secs(2), || !led.is_on()));

    svc.set_external(Enabled);
    assert!(wait_until(Duration::from_secs(2), || led.is_on()));

    tx.send(LoopEvent::Shutdown).unwrap();
    let transitions = worker.join().unwrap();

    assert!(matches!(
        transitions.first(),
        Some(Transition::Toggled {
            observed: Enabled,
            ..
        })
    ));
    assert!(transitions.contains(&Transition::External {
        from: Enabled,
        to: Disabled
    }));
    assert_eq!(led.current(), Some(false), "LED off after shutdown");
    assert!(!button.is_armed());
}
