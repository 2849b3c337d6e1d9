//! End-to-end behavior of the bridge: ordering, counting, shutdown.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use tickbridge_core::{Bridge, BridgeError, BridgeOptions, SuiteFinish};
use tickbridge_types::BridgeState;

use crate::common::{BrokenDiscovery, Recorder, discovery, fast_options};

#[test]
fn three_suites_stop_the_loop_after_the_third() {
    let bridge = Bridge::<Recorder>::new(discovery(&["a", "b", "c"]), fast_options());
    bridge.boot(|| Ok(Recorder::default())).unwrap();

    for _ in 0..2 {
        bridge.execute(|host: &mut Recorder| host.ticks).unwrap();
    }

    assert_eq!(
        bridge.on_suite_finished().unwrap(),
        SuiteFinish::Continue { remaining: 2 }
    );
    assert_eq!(
        bridge.on_suite_finished().unwrap(),
        SuiteFinish::Continue { remaining: 1 }
    );
    assert!(bridge.signals().keep_running());

    assert_eq!(bridge.on_suite_finished().unwrap(), SuiteFinish::Stopped);
    assert!(!bridge.signals().keep_running());
    assert!(bridge.signals().finished().is_released());
    assert_eq!(bridge.state(), BridgeState::Stopped);
    assert_eq!(bridge.counter_remaining(), Some(0));
}

#[test]
fn last_suite_returns_within_one_slow_tick() {
    let tick = Duration::from_millis(200);
    let options = BridgeOptions {
        tick_interval: tick,
        ..fast_options()
    };
    let bridge = Bridge::<Recorder>::new(discovery(&["slow"]), options);
    bridge.boot(|| Ok(Recorder::default())).unwrap();

    let started = Instant::now();
    assert_eq!(bridge.on_suite_finished().unwrap(), SuiteFinish::Stopped);
    let waited = started.elapsed();

    // The loop sees the flag at its next tick; allow scheduling slack only.
    assert!(waited <= tick + tick / 2, "shutdown took {waited:?}");
    assert_eq!(bridge.state(), BridgeState::Stopped);
}

#[test]
fn failed_discovery_stops_after_the_first_suite() {
    let bridge = Bridge::<Recorder>::new(BrokenDiscovery, fast_options());
    bridge.boot(|| Ok(Recorder::default())).unwrap();

    assert_eq!(bridge.on_suite_finished().unwrap(), SuiteFinish::Stopped);
    assert_eq!(bridge.state(), BridgeState::Stopped);
    assert!(bridge.discover_suites().is_empty());
}

#[test]
fn items_run_in_submission_order_exactly_once() {
    let bridge = Bridge::<Recorder>::new(discovery(&["order"]), fast_options());
    bridge.boot(|| Ok(Recorder::default())).unwrap();

    let handles: Vec<_> = (0..50u32)
        .map(|n| {
            bridge
                .submit(move |host: &mut Recorder| {
                    host.applied.push(n);
                    host.applied.len()
                })
                .unwrap()
        })
        .collect();
    let seqs: Vec<u64> = handles.iter().map(|h| h.seq()).collect();
    assert!(seqs.windows(2).all(|w| w[0] < w[1]));

    for (index, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.wait().unwrap(), index + 1);
    }

    let applied = bridge
        .execute(|host: &mut Recorder| host.applied.clone())
        .unwrap();
    assert_eq!(applied, (0..50).collect::<Vec<u32>>());

    bridge.on_suite_finished().unwrap();
}

#[test]
fn every_item_runs_on_the_same_host_thread_between_ticks() {
    let bridge = Bridge::<Recorder>::new(discovery(&["affinity"]), fast_options());
    bridge.boot(|| Ok(Recorder::default())).unwrap();

    let mut last_ticks = 0;
    let mut threads = Vec::new();
    for _ in 0..5 {
        let (ticks, id) = bridge
            .execute(|host: &mut Recorder| (host.ticks, thread::current().id()))
            .unwrap();
        // Each rendezvous waits for a fresh drain, which follows a fresh tick.
        assert!(ticks > last_ticks);
        last_ticks = ticks;
        threads.push(id);
    }
    assert!(threads.iter().all(|id| *id == threads[0]));
    assert_ne!(threads[0], thread::current().id());

    bridge.on_suite_finished().unwrap();
}

#[test]
fn concurrent_boots_build_one_host() {
    let bridge = Bridge::<Recorder>::new(discovery(&["boot"]), fast_options());
    let built = Arc::new(AtomicUsize::new(0));

    let workers: Vec<_> = (0..4)
        .map(|_| {
            let bridge = Arc::clone(&bridge);
            let built = Arc::clone(&built);
            thread::spawn(move || {
                bridge.boot(move || {
                    built.fetch_add(1, Ordering::SeqCst);
                    Ok(Recorder::default())
                })
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap().unwrap();
    }

    assert_eq!(built.load(Ordering::SeqCst), 1);
    assert_eq!(bridge.state(), BridgeState::Running);
    bridge.shutdown().unwrap();
}

#[test]
fn work_after_stop_is_rejected() {
    let bridge = Bridge::<Recorder>::new(discovery(&["only"]), fast_options());
    bridge.boot(|| Ok(Recorder::default())).unwrap();
    bridge.on_suite_finished().unwrap();

    let err = bridge.execute(|host: &mut Recorder| host.ticks).unwrap_err();
    assert!(matches!(
        err,
        BridgeError::NotRunning {
            state: BridgeState::Stopped
        }
    ));
    // Repeated shutdown is harmless.
    bridge.shutdown().unwrap();
}
