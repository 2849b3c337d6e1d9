//! Shared test hosts and fixtures
//!
//! Common infrastructure for integration tests.

#![allow(dead_code)]

use std::thread;
use std::time::Duration;

use tickbridge_core::{BridgeOptions, Discovery, DiscoveryError, Host, StaticDiscovery};
use tickbridge_types::{NonEmptyString, SuiteId, SuiteRef};

pub const MARKER: &str = "host-loop";

/// Host that counts ticks and records what work did to it.
#[derive(Debug, Default)]
pub struct Recorder {
    pub ticks: u64,
    pub applied: Vec<u32>,
    /// Panic on the next tick once set.
    pub explode_on_tick: bool,
    /// Panic in the shutdown hook once set.
    pub explode_on_shutdown: bool,
}

impl Host for Recorder {
    fn tick(&mut self) {
        assert!(!self.explode_on_tick, "host tick exploded");
        self.ticks += 1;
    }

    fn shutdown(&mut self) {
        assert!(!self.explode_on_shutdown, "host shutdown exploded");
    }
}

/// Host whose shutdown hook takes a long time.
#[derive(Debug)]
pub struct SlowShutdown {
    pub delay: Duration,
}

impl Host for SlowShutdown {
    fn tick(&mut self) {}

    fn shutdown(&mut self) {
        thread::sleep(self.delay);
    }
}

/// Discovery source that always fails.
pub struct BrokenDiscovery;

impl Discovery for BrokenDiscovery {
    fn find_annotated(&self, _marker: &str) -> Result<Vec<SuiteRef>, DiscoveryError> {
        Err(DiscoveryError::new("classpath scan failed"))
    }
}

pub fn discovery(names: &[&str]) -> StaticDiscovery {
    StaticDiscovery::new(
        names
            .iter()
            .map(|name| {
                SuiteRef::new(
                    SuiteId::new(*name).unwrap(),
                    NonEmptyString::new(MARKER).unwrap(),
                )
            })
            .collect(),
    )
}

/// Fast ticks and a generous shutdown bound so a broken test fails instead
/// of hanging.
pub fn fast_options() -> BridgeOptions {
    BridgeOptions {
        marker: MARKER.to_string(),
        tick_interval: Duration::from_millis(1),
        shutdown_timeout: Some(Duration::from_secs(10)),
        work_timeout: Some(Duration::from_secs(10)),
    }
}
