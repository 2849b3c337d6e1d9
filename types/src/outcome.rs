//! Per-test outcomes and the aggregate run summary.

use std::fmt;

/// Result of executing one test case on the host loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestOutcome {
    Passed,
    /// The test body returned an assertion failure.
    Failed(String),
    /// The test body panicked while running on the host loop thread.
    Panicked(String),
    /// The harness could not deliver the test to the host loop
    /// (loop stopped, work abandoned, or a bounded wait expired).
    Errored(String),
}

impl TestOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Passed)
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed(_) => "failed",
            Self::Panicked(_) => "panicked",
            Self::Errored(_) => "errored",
        }
    }

    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Passed => None,
            Self::Failed(msg) | Self::Panicked(msg) | Self::Errored(msg) => Some(msg),
        }
    }
}

/// Counts accumulated over a whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    run: usize,
    failed: usize,
    suites: usize,
}

impl RunSummary {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: &TestOutcome) {
        self.run += 1;
        if !outcome.is_success() {
            self.failed += 1;
        }
    }

    pub fn record_suite(&mut self) {
        self.suites += 1;
    }

    #[must_use]
    pub fn run_count(&self) -> usize {
        self.run
    }

    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failed
    }

    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.run - self.failed
    }

    #[must_use]
    pub fn suite_count(&self) -> usize {
        self.suites
    }

    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Test run: {}, Failed: {}", self.run, self.failed)
    }
}
