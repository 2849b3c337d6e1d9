//! Everything around the bridge that turns it into a test run: suites and
//! their registry, the runner loop, listeners that report outcomes, and the
//! glue that prepares a working directory and relaunches the harness in it.

mod launcher;
mod listener;
mod prep;
mod registry;
mod runner;
mod suite;

pub use launcher::{LaunchError, ProcessLauncher, RUN_SUBCOMMAND};
pub use listener::{
    CompositeListener, LoggingListener, RecordingListener, RunEvent, RunListener,
};
pub use prep::{EULA_FILE, PrepError, PreparedDir, prepare};
pub use registry::{RegistryError, SuiteRegistry};
pub use runner::{SuiteRunner, bridge_options};
pub use suite::{CaseBody, TestCase, TestSuite};
