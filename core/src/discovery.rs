//! Pluggable suite discovery.
//!
//! The bridge only needs to know *how many* suites carry its marker (to know
//! when the last one has finished) and *which* ones to run. How they are
//! found is up to the [`Discovery`] implementation. Failures never abort a
//! run: they are logged and treated as "nothing found".

use std::sync::Arc;

use thiserror::Error;

use tickbridge_types::SuiteRef;

#[derive(Debug, Clone, Error)]
#[error("suite discovery failed: {reason}")]
pub struct DiscoveryError {
    reason: String,
}

impl DiscoveryError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Source of suites tagged with a runner marker.
pub trait Discovery: Send + Sync {
    /// Every suite whose marker equals `marker`, in run order.
    fn find_annotated(&self, marker: &str) -> Result<Vec<SuiteRef>, DiscoveryError>;
}

impl<D: Discovery + ?Sized> Discovery for Arc<D> {
    fn find_annotated(&self, marker: &str) -> Result<Vec<SuiteRef>, DiscoveryError> {
        (**self).find_annotated(marker)
    }
}

impl<D: Discovery + ?Sized> Discovery for Box<D> {
    fn find_annotated(&self, marker: &str) -> Result<Vec<SuiteRef>, DiscoveryError> {
        (**self).find_annotated(marker)
    }
}

/// Discovery over a fixed list of suite references.
#[derive(Debug, Clone, Default)]
pub struct StaticDiscovery {
    suites: Vec<SuiteRef>,
}

impl StaticDiscovery {
    #[must_use]
    pub fn new(suites: Vec<SuiteRef>) -> Self {
        Self { suites }
    }
}

impl Discovery for StaticDiscovery {
    fn find_annotated(&self, marker: &str) -> Result<Vec<SuiteRef>, DiscoveryError> {
        Ok(self
            .suites
            .iter()
            .filter(|suite| suite.marker() == marker)
            .cloned()
            .collect())
    }
}

/// Suites to run for `marker`. A failing source yields an empty list.
pub fn discover_suites(discovery: &dyn Discovery, marker: &str) -> Vec<SuiteRef> {
    match discovery.find_annotated(marker) {
        Ok(suites) => suites,
        Err(err) => {
            tracing::warn!(marker, error = %err, "Could not discover suites to run");
            Vec::new()
        }
    }
}

/// Starting value for the shutdown counter.
///
/// A failing source or an empty result counts as zero, which makes the first
/// finished suite trigger shutdown: degraded, but never a hang.
pub fn count_suites(discovery: &dyn Discovery, marker: &str) -> i64 {
    match discovery.find_annotated(marker) {
        Ok(suites) if suites.is_empty() => {
            tracing::warn!(
                marker,
                "No suites discovered; host loop will stop after the first suite"
            );
            0
        }
        Ok(suites) => i64::try_from(suites.len()).unwrap_or(i64::MAX),
        Err(err) => {
            tracing::warn!(
                marker,
                error = %err,
                "Could not count suites; host loop will stop after the first suite"
            );
            0
        }
    }
}
