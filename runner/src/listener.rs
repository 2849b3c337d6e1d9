//! Run listeners: the reporting side of a test run.

use tickbridge_types::{RunSummary, SuiteId, SuiteRef, TestId, TestOutcome};

/// Receives run progress from [`SuiteRunner`](crate::SuiteRunner).
///
/// Called on the test thread, never on the host loop.
pub trait RunListener {
    fn run_started(&mut self, _suites: &[SuiteRef]) {}
    fn test_started(&mut self, id: &TestId);
    fn test_finished(&mut self, id: &TestId, outcome: &TestOutcome);
    fn suite_finished(&mut self, _suite: &SuiteId) {}
    fn run_finished(&mut self, _summary: &RunSummary) {}
}

/// Reports progress through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingListener;

impl RunListener for LoggingListener {
    fn run_started(&mut self, suites: &[SuiteRef]) {
        tracing::info!(suites = suites.len(), "Running test suites:");
        for suite in suites {
            tracing::info!(marker = %suite.marker(), "  {}", suite.id());
        }
    }

    fn test_started(&mut self, id: &TestId) {
        tracing::info!("Test started: {id}");
    }

    fn test_finished(&mut self, id: &TestId, outcome: &TestOutcome) {
        match outcome.detail() {
            None => tracing::info!(outcome = outcome.label(), "Test finished: {id}"),
            Some(detail) => {
                tracing::warn!(outcome = outcome.label(), "Test finished: {id}: {detail}");
            }
        }
    }

    fn run_finished(&mut self, summary: &RunSummary) {
        if summary.all_passed() {
            tracing::info!("{summary}");
        } else {
            tracing::warn!("{summary}");
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    RunStarted(Vec<SuiteId>),
    TestStarted(TestId),
    TestFinished(TestId, TestOutcome),
    SuiteFinished(SuiteId),
    RunFinished(RunSummary),
}

/// Keeps every event in memory.
#[derive(Debug, Default, Clone)]
pub struct RecordingListener {
    events: Vec<RunEvent>,
}

impl RecordingListener {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> &[RunEvent] {
        &self.events
    }

    /// Every finished test with its outcome, in completion order.
    #[must_use]
    pub fn outcomes(&self) -> Vec<(TestId, TestOutcome)> {
        self.events
            .iter()
            .filter_map(|event| match event {
                RunEvent::TestFinished(id, outcome) => Some((id.clone(), outcome.clone())),
                _ => None,
            })
            .collect()
    }
}

impl RunListener for RecordingListener {
    fn run_started(&mut self, suites: &[SuiteRef]) {
        self.events.push(RunEvent::RunStarted(
            suites.iter().map(|suite| suite.id().clone()).collect(),
        ));
    }

    fn test_started(&mut self, id: &TestId) {
        self.events.push(RunEvent::TestStarted(id.clone()));
    }

    fn test_finished(&mut self, id: &TestId, outcome: &TestOutcome) {
        self.events
            .push(RunEvent::TestFinished(id.clone(), outcome.clone()));
    }

    fn suite_finished(&mut self, suite: &SuiteId) {
        self.events.push(RunEvent::SuiteFinished(suite.clone()));
    }

    fn run_finished(&mut self, summary: &RunSummary) {
        self.events.push(RunEvent::RunFinished(*summary));
    }
}

/// Fans every call out to its children, in insertion order.
#[derive(Default)]
pub struct CompositeListener<'a> {
    listeners: Vec<&'a mut dyn RunListener>,
}

impl<'a> CompositeListener<'a> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, listener: &'a mut dyn RunListener) -> Self {
        self.listeners.push(listener);
        self
    }
}

impl RunListener for CompositeListener<'_> {
    fn run_started(&mut self, suites: &[SuiteRef]) {
        for listener in &mut self.listeners {
            listener.run_started(suites);
        }
    }

    fn test_started(&mut self, id: &TestId) {
        for listener in &mut self.listeners {
            listener.test_started(id);
        }
    }

    fn test_finished(&mut self, id: &TestId, outcome: &TestOutcome) {
        for listener in &mut self.listeners {
            listener.test_finished(id, outcome);
        }
    }

    fn suite_finished(&mut self, suite: &SuiteId) {
        for listener in &mut self.listeners {
            listener.suite_finished(suite);
        }
    }

    fn run_finished(&mut self, summary: &RunSummary) {
        for listener in &mut self.listeners {
            listener.run_finished(summary);
        }
    }
}
