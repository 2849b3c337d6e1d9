use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use tickbridge_core::{Discovery, DiscoveryError};
use tickbridge_types::{SuiteId, SuiteRef};

use crate::suite::TestSuite;

#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    #[error("suite '{0}' is already registered")]
    Duplicate(SuiteId),
}

/// All suites known to a run, in registration order.
///
/// Doubles as the run's [`Discovery`] source: a suite is "annotated" for a
/// marker when its own marker equals it.
pub struct SuiteRegistry<H> {
    suites: Vec<Arc<TestSuite<H>>>,
}

impl<H> SuiteRegistry<H> {
    #[must_use]
    pub fn new() -> Self {
        Self { suites: Vec::new() }
    }

    pub fn register(&mut self, suite: TestSuite<H>) -> Result<(), RegistryError> {
        if self.get(suite.id()).is_some() {
            return Err(RegistryError::Duplicate(suite.id().clone()));
        }
        tracing::debug!(suite = %suite.id(), marker = suite.marker(), "Registered suite");
        self.suites.push(Arc::new(suite));
        Ok(())
    }

    #[must_use]
    pub fn get(&self, id: &SuiteId) -> Option<Arc<TestSuite<H>>> {
        self.suites.iter().find(|suite| suite.id() == id).cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TestSuite<H>> {
        self.suites.iter().map(AsRef::as_ref)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.suites.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.suites.is_empty()
    }
}

impl<H> Default for SuiteRegistry<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> Discovery for SuiteRegistry<H> {
    fn find_annotated(&self, marker: &str) -> Result<Vec<SuiteRef>, DiscoveryError> {
        Ok(self
            .suites
            .iter()
            .filter(|suite| suite.marker() == marker)
            .map(|suite| suite.reference())
            .collect())
    }
}

impl<H> fmt::Debug for SuiteRegistry<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.suites.iter()).finish()
    }
}
