use std::time::Duration;

use thiserror::Error;

use tickbridge_types::BridgeState;

use crate::work::WorkFailure;

/// Why a host could not be constructed on its loop thread.
#[derive(Debug, Clone, Error)]
#[error("{reason}")]
pub struct BootError {
    reason: String,
}

impl BootError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum BridgeError {
    /// The host loop thread could not be started. Fatal for the run.
    #[error("host loop failed to boot: {0}")]
    Boot(#[from] BootError),
    #[error("bridge is not accepting work (state: {state})")]
    NotRunning { state: BridgeState },
    /// Blocking on work from the host loop thread itself would deadlock.
    #[error("cannot wait on host-loop work from the host loop thread")]
    Reentrant,
    #[error(transparent)]
    Work(#[from] WorkFailure),
    #[error("host loop did not shut down within {0:?}")]
    ShutdownTimedOut(Duration),
    #[error("host loop thread panicked")]
    HostPanicked,
}

impl BridgeError {
    /// Structural failures end the run; the rest are per-test failures.
    #[must_use]
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::Boot(_) | Self::ShutdownTimedOut(_) | Self::HostPanicked
        )
    }
}
