use crossbeam_channel as xch;
use scale_core::mocks::{Script, ScriptedOpener};
use scale_core::{
    DeviceLocation, EventSink, NullSink, Poller, PollingSession, Reading, ReadingSource,
    ScaleError, ScaleEvent, TerminationReason, TimingCfg, WeightText,
};
use scale_traits::clock::test_clock::TestClock;
use scale_traits::{Clock, MonotonicClock};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

const FRAME: &[u8] = b"\x0201250\x03";

fn loc() -> DeviceLocation {
    DeviceLocation::new("COM3", 9600)
}

fn poller<C: Clock + Clone + Send + Sync + 'static>(
    opener: &ScriptedOpener,
    clock: C,
    timing: TimingCfg,
    sink: Arc<dyn EventSink>,
) -> Poller<ScriptedOpener, C> {
    Poller::new(Arc::new(opener.clone()), timing, clock, sink)
}

fn fast_timing() -> TimingCfg {
    TimingCfg {
        settle_ms: 5,
        read_timeout_ms: 5,
        session_budget_ms: 60_000,
    }
}

#[test]
fn cancelled_session_exits_before_any_request() {
    let opener = ScriptedOpener::new().with_fallback(Script::Repeat(FRAME.to_vec()));
    let clock = TestClock::new();
    let p = poller(&opener, clock.clone(), TimingCfg::default(), Arc::new(NullSink));
    let session = PollingSession::new(loc(), clock.now());
    assert!(session.stopper().stop());

    let mut readings = Vec::new();
    let reason = p.run_session(&session, Duration::from_secs(30), &mut |r| readings.push(r));

    assert_eq!(reason, TerminationReason::StoppedByCaller);
    assert!(readings.is_empty());
    let log = opener.log();
    assert_eq!(log.successful_opens, 1);
    assert!(log.writes.is_empty());
    assert_eq!(log.live_links(), 0);
}

#[test]
fn budget_expiry_terminates_without_stop() {
    let opener = ScriptedOpener::new().with_fallback(Script::Repeat(FRAME.to_vec()));
    let clock = TestClock::new();
    let p = poller(&opener, clock.clone(), TimingCfg::default(), Arc::new(NullSink));
    let session = PollingSession::new(loc(), clock.now());

    let mut readings: Vec<Reading> = Vec::new();
    let reason = p.run_session(&session, Duration::from_secs(30), &mut |r| readings.push(r));

    assert_eq!(reason, TerminationReason::TimeBudgetExpired);
    // Requests start at t = 0, 0.5, ... 30.0 s; the check at 30.5 s exits.
    assert_eq!(readings.len(), 61);
    assert!(
        readings
            .iter()
            .all(|r| r.weight() == &WeightText::Value("01250".to_string()))
    );
    assert_eq!(opener.log().live_links(), 0);
    // The session connection is opened once, not per request.
    assert_eq!(opener.log().successful_opens, 1);
}

#[test]
fn readings_follow_request_order() {
    let opener = ScriptedOpener::new().with_fallback(Script::Replies(vec![
        b"[1]".to_vec(),
        b"[22]".to_vec(),
        b"[333]".to_vec(),
    ]));
    let clock = TestClock::new();
    let p = poller(&opener, clock.clone(), TimingCfg::default(), Arc::new(NullSink));
    let session = PollingSession::new(loc(), clock.now());

    let mut readings: Vec<Reading> = Vec::new();
    let reason = p.run_session(&session, Duration::from_millis(2000), &mut |r| {
        readings.push(r)
    });

    assert_eq!(reason, TerminationReason::TimeBudgetExpired);
    let weights: Vec<String> = readings.iter().map(|r| r.weight().to_string()).collect();
    assert_eq!(weights, vec!["1", "22", "333", "---", "---"]);
    assert!(readings.windows(2).all(|w| w[0].timestamp() < w[1].timestamp()));
    assert_eq!(readings[3].raw_payload(), b"");
}

#[test]
fn transport_failure_terminates_and_releases() {
    let opener = ScriptedOpener::new().with_fallback(Script::FailAfter {
        reply: FRAME.to_vec(),
        ok_reads: 2,
    });
    let clock = TestClock::new();
    let (tx, rx) = xch::unbounded();
    let p = poller(&opener, clock.clone(), TimingCfg::default(), Arc::new(tx));
    let session = PollingSession::new(loc(), clock.now());

    let mut count = 0;
    let reason = p.run_session(&session, Duration::from_secs(30), &mut |_| count += 1);

    assert!(matches!(reason, TerminationReason::TransportError(ref d) if d.contains("disconnected")));
    assert_eq!(count, 2);
    assert_eq!(opener.log().live_links(), 0);
    let events: Vec<ScaleEvent> = rx.try_iter().collect();
    assert!(matches!(
        events.last(),
        Some(ScaleEvent::SessionTerminated(TerminationReason::TransportError(_)))
    ));
}

#[test]
fn open_failure_terminates_with_transport_error() {
    let opener = ScriptedOpener::new().with_fallback(Script::Unavailable);
    let p = poller(&opener, TestClock::new(), TimingCfg::default(), Arc::new(NullSink));
    let terminated = Arc::new(AtomicUsize::new(0));
    let t = terminated.clone();

    let handle = p.start(loc(), Duration::from_secs(30), |_| {}, move |reason| {
        assert!(matches!(reason, TerminationReason::TransportError(_)));
        t.fetch_add(1, Ordering::SeqCst);
    });
    let reason = handle.join().expect("join");

    assert!(matches!(reason, TerminationReason::TransportError(ref d) if d.contains("COM3")));
    assert_eq!(terminated.load(Ordering::SeqCst), 1);
}

#[test]
fn threaded_session_ends_on_budget_with_simulated_clock() {
    let opener = ScriptedOpener::new().with_fallback(Script::Repeat(FRAME.to_vec()));
    let p = poller(&opener, TestClock::new(), TimingCfg::default(), Arc::new(NullSink));
    let reasons = Arc::new(Mutex::new(Vec::new()));
    let r = reasons.clone();

    let handle = p.start(loc(), Duration::from_secs(30), |_| {}, move |reason| {
        r.lock().unwrap().push(reason)
    });
    let reason = handle.join().expect("join");

    assert_eq!(reason, TerminationReason::TimeBudgetExpired);
    assert_eq!(
        *reasons.lock().unwrap(),
        vec![TerminationReason::TimeBudgetExpired]
    );
    assert_eq!(opener.log().live_links(), 0);
}

#[test]
fn stop_is_observed_within_one_cycle() {
    let opener = ScriptedOpener::new().with_fallback(Script::Repeat(FRAME.to_vec()));
    let timing = TimingCfg {
        settle_ms: 50,
        ..fast_timing()
    };
    let p = poller(&opener, MonotonicClock::new(), timing, Arc::new(NullSink));
    let readings = Arc::new(AtomicUsize::new(0));
    let terminated = Arc::new(AtomicUsize::new(0));
    let (r, t) = (readings.clone(), terminated.clone());

    let handle = p.start(
        loc(),
        Duration::from_secs(60),
        move |_| {
            r.fetch_add(1, Ordering::SeqCst);
        },
        move |_| {
            t.fetch_add(1, Ordering::SeqCst);
        },
    );
    let started = Instant::now();
    handle.stop();
    let reason = handle.join().expect("join");

    assert_eq!(reason, TerminationReason::StoppedByCaller);
    assert!(readings.load(Ordering::SeqCst) <= 1);
    assert!(started.elapsed() < Duration::from_millis(500));
    assert_eq!(terminated.load(Ordering::SeqCst), 1);
    assert_eq!(opener.log().live_links(), 0);
}

#[test]
fn stop_is_idempotent() {
    let opener = ScriptedOpener::new();
    let p = poller(&opener, MonotonicClock::new(), fast_timing(), Arc::new(NullSink));
    let handle = p.start(loc(), Duration::from_secs(60), |_| {}, |_| {});
    let stopper = handle.stopper();

    handle.stop();
    handle.stop();
    assert!(!stopper.stop());
    assert!(stopper.is_stopped());
    assert_eq!(handle.join().unwrap(), TerminationReason::StoppedByCaller);
    // Stopping a finished session is still harmless.
    assert!(!stopper.stop());
}

#[test]
fn dropping_the_handle_stops_and_joins() {
    let opener = ScriptedOpener::new().with_fallback(Script::Repeat(FRAME.to_vec()));
    let p = poller(&opener, MonotonicClock::new(), fast_timing(), Arc::new(NullSink));
    let terminated = Arc::new(AtomicUsize::new(0));
    let t = terminated.clone();

    let handle = p.start(loc(), Duration::from_secs(60), |_| {}, move |reason| {
        assert_eq!(reason, TerminationReason::StoppedByCaller);
        t.fetch_add(1, Ordering::SeqCst);
    });
    std::thread::sleep(Duration::from_millis(30));
    drop(handle);

    assert_eq!(terminated.load(Ordering::SeqCst), 1);
    assert_eq!(opener.log().live_links(), 0);
}

#[test]
fn read_once_without_location_does_no_io() {
    let opener = ScriptedOpener::new().with_fallback(Script::Repeat(FRAME.to_vec()));
    let p = poller(&opener, TestClock::new(), TimingCfg::default(), Arc::new(NullSink));

    let err = p.read_once(None).expect_err("no device known");

    assert_eq!(err.downcast_ref::<ScaleError>(), Some(&ScaleError::NoDeviceKnown));
    let log = opener.log();
    assert!(log.opens.is_empty());
    assert!(log.writes.is_empty());
}

#[test]
fn read_once_performs_one_cycle_on_its_own_connection() {
    let opener = ScriptedOpener::new().with_fallback(Script::Repeat(FRAME.to_vec()));
    let clock = TestClock::new();
    let (tx, rx) = xch::unbounded();
    let p = poller(&opener, clock.clone(), TimingCfg::default(), Arc::new(tx));

    let reading = p.read_once(Some(&loc())).expect("reading");

    assert_eq!(reading.weight(), &WeightText::Value("01250".to_string()));
    assert_eq!(reading.raw_payload(), FRAME);
    let log = opener.log();
    assert_eq!(log.opens, vec![("COM3".to_string(), 9600)]);
    assert_eq!(log.writes, vec![vec![0x05]]);
    assert_eq!(log.reads, 1);
    assert_eq!(log.live_links(), 0);
    assert_eq!(clock.elapsed(), Duration::from_millis(500));
    assert!(rx.try_iter().any(|e| matches!(
        e,
        ScaleEvent::WeightChanged {
            source: ReadingSource::Manual,
            ..
        }
    )));
}

#[test]
fn read_once_reports_unavailable_port() {
    let opener = ScriptedOpener::new().with_fallback(Script::Unavailable);
    let p = poller(&opener, TestClock::new(), TimingCfg::default(), Arc::new(NullSink));

    let err = p.read_once(Some(&loc())).expect_err("port busy");

    match err.downcast_ref::<ScaleError>() {
        Some(ScaleError::TransportUnavailable { port, .. }) => assert_eq!(port, "COM3"),
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn read_once_maps_read_failure_to_transport_error() {
    let opener = ScriptedOpener::new().with_fallback(Script::FailAfter {
        reply: FRAME.to_vec(),
        ok_reads: 0,
    });
    let p = poller(&opener, TestClock::new(), TimingCfg::default(), Arc::new(NullSink));

    let err = p.read_once(Some(&loc())).expect_err("read fails");

    assert!(matches!(
        err.downcast_ref::<ScaleError>(),
        Some(ScaleError::Transport(_))
    ));
    assert_eq!(opener.log().live_links(), 0);
}

#[test]
fn manual_read_runs_alongside_a_session() {
    let opener = ScriptedOpener::new().with_fallback(Script::Repeat(FRAME.to_vec()));
    let p = poller(&opener, MonotonicClock::new(), fast_timing(), Arc::new(NullSink));
    let handle = p.start(loc(), Duration::from_secs(60), |_| {}, |_| {});
    std::thread::sleep(Duration::from_millis(20));

    let reading = p.read_once(Some(&loc())).expect("manual read");
    assert!(reading.weight().is_available());
    // The session's connection and the manual one were both open at some point.
    assert_eq!(opener.log().successful_opens, 2);

    handle.stop();
    assert_eq!(handle.join().unwrap(), TerminationReason::StoppedByCaller);
    assert_eq!(opener.log().live_links(), 0);
}
