use std::sync::atomic::{AtomicBool, Ordering};

use crate::gate::CompletionGate;

/// The two flags a host exposes to the bridge.
///
/// `keep_running` is read by the host loop once per tick and cleared exactly
/// once by the bridge. `finished` is released by the host loop on its way out.
#[derive(Debug)]
pub struct HostSignals {
    keep_running: AtomicBool,
    finished: CompletionGate,
}

impl HostSignals {
    #[must_use]
    pub fn new() -> Self {
        Self {
            keep_running: AtomicBool::new(true),
            finished: CompletionGate::new(),
        }
    }

    #[must_use]
    pub fn keep_running(&self) -> bool {
        self.keep_running.load(Ordering::Acquire)
    }

    /// Clear `keep_running`. Returns `true` only for the call that cleared it.
    pub fn request_stop(&self) -> bool {
        self.keep_running.swap(false, Ordering::AcqRel)
    }

    #[must_use]
    pub fn finished(&self) -> &CompletionGate {
        &self.finished
    }
}

impl Default for HostSignals {
    fn default() -> Self {
        Self::new()
    }
}
