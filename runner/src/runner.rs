//! Drives registered suites through a [`Bridge`].

use std::sync::Arc;

use tickbridge_config::TickbridgeConfig;
use tickbridge_core::{BootError, Bridge, BridgeError, BridgeOptions, Host, WorkFailure};
use tickbridge_types::{BridgeState, RunSummary, SuiteRef, TestOutcome};

use crate::listener::RunListener;
use crate::registry::SuiteRegistry;
use crate::suite::TestSuite;

type HostFactory<H> = Box<dyn FnOnce() -> Result<H, BootError> + Send>;

/// Bridge settings taken from a loaded configuration.
#[must_use]
pub fn bridge_options(config: &TickbridgeConfig) -> BridgeOptions {
    BridgeOptions {
        marker: config.discovery.marker().to_string(),
        tick_interval: config.host.tick_interval(),
        shutdown_timeout: config.host.shutdown_timeout(),
        work_timeout: config.host.work_timeout(),
    }
}

/// Runs every discovered suite case by case on the host loop.
///
/// The host loop is booted lazily, right before the first suite. After each
/// suite the bridge's counter is decremented; the last suite stops the loop.
pub struct SuiteRunner<H> {
    bridge: Arc<Bridge<H>>,
    registry: Arc<SuiteRegistry<H>>,
    factory: Option<HostFactory<H>>,
}

impl<H: Host + 'static> SuiteRunner<H> {
    pub fn new<F>(registry: SuiteRegistry<H>, options: BridgeOptions, factory: F) -> Self
    where
        F: FnOnce() -> Result<H, BootError> + Send + 'static,
    {
        let registry = Arc::new(registry);
        let bridge = Bridge::new(Arc::clone(&registry), options);
        Self {
            bridge,
            registry,
            factory: Some(Box::new(factory)),
        }
    }

    #[must_use]
    pub fn bridge(&self) -> &Arc<Bridge<H>> {
        &self.bridge
    }

    /// Run all suites. Per-test failures land in the summary; only
    /// structural failures (boot, host loop panic, shutdown timeout) are
    /// returned as errors.
    pub fn run(&mut self, listener: &mut dyn RunListener) -> Result<RunSummary, BridgeError> {
        let suites = self.bridge.discover_suites();
        listener.run_started(&suites);

        let mut summary = RunSummary::new();
        for suite_ref in &suites {
            match self.registry.get(suite_ref.id()) {
                Some(suite) => {
                    self.ensure_booted()?;
                    self.run_suite(&suite, listener, &mut summary);
                }
                None => {
                    tracing::warn!(suite = %suite_ref.id(), "Discovered suite is not registered; skipping");
                }
            }
            summary.record_suite();
            listener.suite_finished(suite_ref.id());
            self.bridge.on_suite_finished()?;
        }

        self.finish(&suites)?;
        listener.run_finished(&summary);
        Ok(summary)
    }

    fn ensure_booted(&mut self) -> Result<(), BridgeError> {
        if let Some(factory) = self.factory.take() {
            self.bridge.boot(factory)?;
        }
        Ok(())
    }

    fn run_suite(
        &self,
        suite: &TestSuite<H>,
        listener: &mut dyn RunListener,
        summary: &mut RunSummary,
    ) {
        for case in suite.cases() {
            listener.test_started(case.id());
            let body = case.body();
            let outcome = match self.bridge.execute(move |host: &mut H| body(host)) {
                Ok(Ok(())) => TestOutcome::Passed,
                Ok(Err(message)) => TestOutcome::Failed(message),
                Err(BridgeError::Work(WorkFailure::Panicked(payload))) => {
                    TestOutcome::Panicked(payload.message().to_string())
                }
                Err(err) => TestOutcome::Errored(err.to_string()),
            };
            summary.record(&outcome);
            listener.test_finished(case.id(), &outcome);
        }
    }

    /// Make sure the host loop is down even if discovery over-counted.
    fn finish(&self, suites: &[SuiteRef]) -> Result<(), BridgeError> {
        if matches!(
            self.bridge.state(),
            BridgeState::Running | BridgeState::Draining
        ) {
            tracing::warn!(
                ran = suites.len(),
                remaining = ?self.bridge.counter_remaining(),
                "Host loop still running after the last suite; forcing shutdown"
            );
        }
        self.bridge.shutdown()
    }
}

impl<H> std::fmt::Debug for SuiteRunner<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuiteRunner")
            .field("bridge", &self.bridge)
            .field("suites", &self.registry.len())
            .field("booted", &self.factory.is_none())
            .finish()
    }
}
