//! Suite runner against a live host loop.

use tickbridge_core::Host;
use tickbridge_runner::{RecordingListener, RunEvent, SuiteRegistry, SuiteRunner, TestSuite};
use tickbridge_types::{BridgeState, SuiteId, TestOutcome};

use crate::common::{Recorder, fast_options};

fn registry() -> SuiteRegistry<Recorder> {
    let mut registry = SuiteRegistry::new();
    registry
        .register(
            TestSuite::new("first")
                .unwrap()
                .case("push", |host: &mut Recorder| {
                    host.applied.push(1);
                    Ok(())
                })
                .unwrap()
                .case("sees_push", |host: &mut Recorder| {
                    if host.applied == [1] {
                        Ok(())
                    } else {
                        Err(format!("state not shared: {:?}", host.applied))
                    }
                })
                .unwrap(),
        )
        .unwrap();
    registry
        .register(
            TestSuite::new("elsewhere")
                .unwrap()
                .with_marker("plain")
                .unwrap()
                .case("never", |_: &mut Recorder| Err("ran a foreign suite".into()))
                .unwrap(),
        )
        .unwrap();
    registry
        .register(
            TestSuite::new("second")
                .unwrap()
                .case("ticks", |host: &mut Recorder| {
                    let before = host.ticks;
                    host.tick();
                    if host.ticks == before + 1 {
                        Ok(())
                    } else {
                        Err("tick did not advance".into())
                    }
                })
                .unwrap(),
        )
        .unwrap();
    registry
}

#[test]
fn runs_marked_suites_in_order_and_reports_each_step() {
    let mut runner = SuiteRunner::new(registry(), fast_options(), || Ok(Recorder::default()));
    let mut recorder = RecordingListener::new();

    let summary = runner.run(&mut recorder).unwrap();
    assert_eq!(summary.to_string(), "Test run: 3, Failed: 0");
    assert_eq!(summary.suite_count(), 2);
    assert!(summary.all_passed());
    assert_eq!(runner.bridge().state(), BridgeState::Stopped);

    let events = recorder.events();
    assert_eq!(
        events.first(),
        Some(&RunEvent::RunStarted(vec![
            SuiteId::new("first").unwrap(),
            SuiteId::new("second").unwrap(),
        ]))
    );
    let order: Vec<String> = events
        .iter()
        .filter_map(|event| match event {
            RunEvent::TestStarted(id) => Some(format!("start {id}")),
            RunEvent::TestFinished(id, _) => Some(format!("end {id}")),
            RunEvent::SuiteFinished(suite) => Some(format!("suite {suite}")),
            _ => None,
        })
        .collect();
    assert_eq!(
        order,
        vec![
            "start first#push",
            "end first#push",
            "start first#sees_push",
            "end first#sees_push",
            "suite first",
            "start second#ticks",
            "end second#ticks",
            "suite second",
        ]
    );
    assert!(matches!(events.last(), Some(RunEvent::RunFinished(_))));
    assert!(
        recorder
            .outcomes()
            .iter()
            .all(|(_, outcome)| *outcome == TestOutcome::Passed)
    );
}

#[test]
fn failures_are_counted_without_aborting_the_run() {
    let mut registry = SuiteRegistry::new();
    registry
        .register(
            TestSuite::new("mixed")
                .unwrap()
                .case("fails", |_: &mut Recorder| Err("wrong block".into()))
                .unwrap()
                .case("panics", |_: &mut Recorder| -> Result<(), String> {
                    panic!("index out of bounds")
                })
                .unwrap()
                .case("passes", |_: &mut Recorder| Ok(()))
                .unwrap(),
        )
        .unwrap();

    let mut runner = SuiteRunner::new(registry, fast_options(), || Ok(Recorder::default()));
    let mut recorder = RecordingListener::new();
    let summary = runner.run(&mut recorder).unwrap();

    assert_eq!(summary.run_count(), 3);
    assert_eq!(summary.failure_count(), 2);
    assert_eq!(summary.passed_count(), 1);
    let labels: Vec<&str> = recorder
        .outcomes()
        .iter()
        .map(|(_, outcome)| outcome.label())
        .collect();
    assert_eq!(labels, vec!["failed", "panicked", "passed"]);
}
