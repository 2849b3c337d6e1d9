use std::fmt;

use crate::{EmptyStringError, NonEmptyString};

/// Name of a test suite (the unit the shutdown counter decrements on).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SuiteId(NonEmptyString);

impl SuiteId {
    pub fn new(name: impl Into<String>) -> Result<Self, EmptyStringError> {
        NonEmptyString::new(name).map(Self)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for SuiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single test case inside a suite, rendered as `suite#case`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TestId {
    suite: SuiteId,
    case: NonEmptyString,
}

impl TestId {
    pub fn new(suite: SuiteId, case: impl Into<String>) -> Result<Self, EmptyStringError> {
        Ok(Self {
            suite,
            case: NonEmptyString::new(case)?,
        })
    }

    #[must_use]
    pub fn suite(&self) -> &SuiteId {
        &self.suite
    }

    #[must_use]
    pub fn case(&self) -> &str {
        self.case.as_str()
    }
}

impl fmt::Display for TestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.suite, self.case)
    }
}

/// A discovered suite together with the runner marker it was tagged with.
///
/// Discovery hands these out; only suites whose marker matches the bridge's
/// marker are counted and executed on the host loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuiteRef {
    id: SuiteId,
    marker: NonEmptyString,
}

impl SuiteRef {
    #[must_use]
    pub fn new(id: SuiteId, marker: NonEmptyString) -> Self {
        Self { id, marker }
    }

    #[must_use]
    pub fn id(&self) -> &SuiteId {
        &self.id
    }

    #[must_use]
    pub fn marker(&self) -> &str {
        self.marker.as_str()
    }
}
