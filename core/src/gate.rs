//! One-shot cross-thread latch.

use std::sync::{Condvar, Mutex, PoisonError};
use std::time::Duration;

use thiserror::Error;

use crate::sync::lock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("gate was not released within {0:?}")]
pub struct GateTimeout(pub Duration);

/// Single-use barrier: `pending` until [`release`](Self::release), then
/// `released` forever.
///
/// Every current and future waiter unblocks once released. Releasing twice is
/// harmless.
#[derive(Debug, Default)]
pub struct CompletionGate {
    released: Mutex<bool>,
    changed: Condvar,
}

impl CompletionGate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Release all waiters. Returns `true` on the first call only.
    pub fn release(&self) -> bool {
        let mut released = lock(&self.released);
        if *released {
            return false;
        }
        *released = true;
        self.changed.notify_all();
        true
    }

    #[must_use]
    pub fn is_released(&self) -> bool {
        *lock(&self.released)
    }

    /// Block until released. No timeout.
    pub fn wait(&self) {
        let released = lock(&self.released);
        let _released = self
            .changed
            .wait_while(released, |released| !*released)
            .unwrap_or_else(PoisonError::into_inner);
    }

    /// Block until released or until `timeout` elapses.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<(), GateTimeout> {
        let released = lock(&self.released);
        let (released, _) = self
            .changed
            .wait_timeout_while(released, timeout, |released| !*released)
            .unwrap_or_else(PoisonError::into_inner);
        if *released {
            Ok(())
        } else {
            Err(GateTimeout(timeout))
        }
    }
}
