use std::fmt;
use std::sync::Arc;

use tickbridge_core::DEFAULT_MARKER;
use tickbridge_types::{EmptyStringError, NonEmptyString, SuiteId, SuiteRef, TestId};

/// Body of a test case. Runs on the host loop thread with the host borrowed
/// mutably; `Err` is an assertion failure, a panic is captured separately.
pub type CaseBody<H> = Arc<dyn Fn(&mut H) -> Result<(), String> + Send + Sync>;

pub struct TestCase<H> {
    id: TestId,
    body: CaseBody<H>,
}

impl<H> TestCase<H> {
    #[must_use]
    pub fn id(&self) -> &TestId {
        &self.id
    }

    #[must_use]
    pub fn body(&self) -> CaseBody<H> {
        Arc::clone(&self.body)
    }
}

impl<H> fmt::Debug for TestCase<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestCase")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// An ordered group of cases tagged with a runner marker.
///
/// Only suites whose marker matches the bridge's marker are discovered and
/// run on the host loop.
pub struct TestSuite<H> {
    id: SuiteId,
    marker: NonEmptyString,
    cases: Vec<TestCase<H>>,
}

impl<H> TestSuite<H> {
    /// A suite tagged with [`DEFAULT_MARKER`].
    pub fn new(name: impl Into<String>) -> Result<Self, EmptyStringError> {
        Ok(Self {
            id: SuiteId::new(name)?,
            marker: NonEmptyString::new(DEFAULT_MARKER)?,
            cases: Vec::new(),
        })
    }

    pub fn with_marker(mut self, marker: impl Into<String>) -> Result<Self, EmptyStringError> {
        self.marker = NonEmptyString::new(marker)?;
        Ok(self)
    }

    /// Append a case. Cases run in the order they are added.
    pub fn case<F>(mut self, name: impl Into<String>, body: F) -> Result<Self, EmptyStringError>
    where
        F: Fn(&mut H) -> Result<(), String> + Send + Sync + 'static,
    {
        let id = TestId::new(self.id.clone(), name)?;
        self.cases.push(TestCase {
            id,
            body: Arc::new(body),
        });
        Ok(self)
    }

    #[must_use]
    pub fn id(&self) -> &SuiteId {
        &self.id
    }

    #[must_use]
    pub fn marker(&self) -> &str {
        self.marker.as_str()
    }

    #[must_use]
    pub fn cases(&self) -> &[TestCase<H>] {
        &self.cases
    }

    #[must_use]
    pub fn reference(&self) -> SuiteRef {
        SuiteRef::new(self.id.clone(), self.marker.clone())
    }
}

impl<H> fmt::Debug for TestSuite<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestSuite")
            .field("id", &self.id)
            .field("marker", &self.marker)
            .field("cases", &self.cases.len())
            .finish()
    }
}
