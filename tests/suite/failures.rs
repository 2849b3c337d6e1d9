//! Failure paths: panics, dead host loops, boot errors and timeouts.

use std::sync::Arc;
use std::time::Duration;

use tickbridge_core::{BootError, Bridge, BridgeError, BridgeOptions, SuiteFinish, WorkFailure};
use tickbridge_types::BridgeState;

use crate::common::{Recorder, SlowShutdown, discovery, fast_options};

#[test]
fn panicking_item_surfaces_to_its_waiter_and_later_items_run() {
    let bridge = Bridge::<Recorder>::new(discovery(&["p"]), fast_options());
    bridge.boot(|| Ok(Recorder::default())).unwrap();

    let err = bridge
        .execute(|_: &mut Recorder| -> u32 { panic!("expected 2 entities, found {}", 3) })
        .unwrap_err();
    let payload = match err {
        BridgeError::Work(WorkFailure::Panicked(payload)) => payload,
        other => panic!("expected a captured panic, got {other:?}"),
    };
    assert_eq!(payload.message(), "expected 2 entities, found 3");

    let after = bridge
        .execute(|host: &mut Recorder| {
            host.applied.push(7);
            host.applied.clone()
        })
        .unwrap();
    assert_eq!(after, vec![7]);

    bridge.on_suite_finished().unwrap();
}

#[test]
fn resumed_panic_carries_the_original_payload() {
    let bridge = Bridge::<Recorder>::new(discovery(&["p"]), fast_options());
    bridge.boot(|| Ok(Recorder::default())).unwrap();

    let handle = bridge
        .submit(|_: &mut Recorder| -> u8 { std::panic::panic_any(42_u8) })
        .unwrap();
    let failure = handle.wait().unwrap_err();
    let resumed =
        std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || failure.resume()))
            .unwrap_err();
    assert_eq!(resumed.downcast_ref::<u8>(), Some(&42));

    bridge.shutdown().unwrap();
}

#[test]
fn boot_failure_is_fatal_and_leaves_the_bridge_stopped() {
    let bridge = Bridge::<Recorder>::new(discovery(&["x"]), fast_options());
    let err = bridge
        .boot(|| Err(BootError::new("level.dat is locked")))
        .unwrap_err();

    assert!(err.is_structural());
    assert_eq!(
        err.to_string(),
        "host loop failed to boot: level.dat is locked"
    );
    assert_eq!(bridge.state(), BridgeState::Stopped);
    assert!(bridge.signals().finished().is_released());
    bridge.shutdown().unwrap();
}

#[test]
fn panicking_factory_is_a_boot_failure() {
    let bridge = Bridge::<Recorder>::new(discovery(&["x"]), fast_options());
    let err = bridge
        .boot(|| -> Result<Recorder, BootError> { panic!("no world") })
        .unwrap_err();
    assert!(matches!(err, BridgeError::Boot(_)));
    assert_eq!(bridge.state(), BridgeState::Stopped);
}

#[test]
fn host_panic_abandons_queued_work_and_fails_shutdown() {
    let bridge = Bridge::<Recorder>::new(discovery(&["x"]), fast_options());
    bridge.boot(|| Ok(Recorder::default())).unwrap();

    // Queue a follow-up from inside the loop, then make the next tick panic
    // before the follow-up is drained.
    let inner = Arc::clone(&bridge);
    let follow_up = bridge
        .execute(move |host: &mut Recorder| {
            host.explode_on_tick = true;
            inner.submit(|host: &mut Recorder| host.ticks)
        })
        .unwrap()
        .unwrap();

    assert!(matches!(follow_up.wait(), Err(WorkFailure::Abandoned)));

    let err = bridge.shutdown().unwrap_err();
    assert!(matches!(err, BridgeError::HostPanicked));
    assert!(err.is_structural());
    assert_eq!(bridge.state(), BridgeState::Stopped);
}

#[test]
fn panicking_shutdown_hook_is_reported() {
    let bridge = Bridge::<Recorder>::new(discovery(&["x"]), fast_options());
    bridge.boot(|| Ok(Recorder::default())).unwrap();
    bridge
        .execute(|host: &mut Recorder| host.explode_on_shutdown = true)
        .unwrap();

    assert!(matches!(
        bridge.on_suite_finished(),
        Err(BridgeError::HostPanicked)
    ));
}

#[test]
fn bounded_shutdown_times_out_on_a_stalled_host() {
    let options = BridgeOptions {
        shutdown_timeout: Some(Duration::from_millis(20)),
        ..fast_options()
    };
    let bridge = Bridge::<SlowShutdown>::new(discovery(&["slow"]), options);
    bridge
        .boot(|| {
            Ok(SlowShutdown {
                delay: Duration::from_millis(500),
            })
        })
        .unwrap();

    let err = bridge.on_suite_finished().unwrap_err();
    assert!(matches!(err, BridgeError::ShutdownTimedOut(_)));
    assert!(err.is_structural());

    // The loop still finishes on its own.
    bridge.signals().finished().wait();
    assert_eq!(bridge.state(), BridgeState::Stopped);
}

#[test]
fn bounded_work_wait_times_out() {
    let options = BridgeOptions {
        work_timeout: Some(Duration::from_millis(20)),
        ..fast_options()
    };
    let bridge = Bridge::<Recorder>::new(discovery(&["slow"]), options);
    bridge.boot(|| Ok(Recorder::default())).unwrap();

    let err = bridge
        .execute(|_: &mut Recorder| std::thread::sleep(Duration::from_millis(300)))
        .unwrap_err();
    assert!(matches!(err, BridgeError::Work(WorkFailure::TimedOut(_))));
    assert!(!err.is_structural());

    bridge.shutdown().unwrap();
}

#[test]
fn oversized_tick_interval_keeps_the_loop_alive() {
    let options = BridgeOptions {
        tick_interval: Duration::MAX,
        ..fast_options()
    };
    let bridge = Bridge::<Recorder>::new(discovery(&["huge"]), options);
    bridge.boot(|| Ok(Recorder::default())).unwrap();

    let ticks = bridge.execute(|host: &mut Recorder| host.ticks).unwrap();
    assert!(ticks >= 1);
    assert_eq!(bridge.on_suite_finished().unwrap(), SuiteFinish::Stopped);
    assert_eq!(bridge.state(), BridgeState::Stopped);
}
