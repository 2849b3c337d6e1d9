//! Work items and their single-shot completion handles.
//!
//! A [`WorkItem`] is created on the submitting thread and executed exactly once
//! on the host loop thread. Its paired [`WorkHandle`] is the submitter's side of
//! the rendezvous: it blocks until the item has run, then yields the value or
//! the captured failure.
//!
//! Dropping an item without running it (queue abandoned, host loop gone)
//! resolves the handle to [`WorkFailure::Abandoned`], so a waiter can never
//! block on work that no thread will execute.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

use thiserror::Error;

use crate::sync::lock;

type Job<H> = Box<dyn FnOnce(&mut H) + Send>;

/// Panic captured while work ran on the host loop.
pub struct PanicPayload {
    message: String,
    // Mutex only to make the payload `Sync`; it is never contended.
    payload: Mutex<Box<dyn Any + Send>>,
}

impl PanicPayload {
    fn new(payload: Box<dyn Any + Send>) -> Self {
        let message = panic_message(&*payload);
        Self {
            message,
            payload: Mutex::new(payload),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The original payload, suitable for [`panic::resume_unwind`].
    #[must_use]
    pub fn into_inner(self) -> Box<dyn Any + Send> {
        self.payload
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for PanicPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PanicPayload")
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Why a [`WorkHandle`] did not produce a value.
#[derive(Debug, Error)]
pub enum WorkFailure {
    #[error("work panicked on the host loop: {}", .0.message())]
    Panicked(PanicPayload),
    #[error("work was dropped before the host loop executed it")]
    Abandoned,
    #[error("work did not complete within {0:?}")]
    TimedOut(Duration),
}

impl WorkFailure {
    /// Re-raise the failure on the current thread.
    ///
    /// A captured panic resumes with its original payload, so the caller sees
    /// exactly what the work panicked with.
    pub fn resume(self) -> ! {
        match self {
            WorkFailure::Panicked(payload) => panic::resume_unwind(payload.into_inner()),
            other => panic!("{other}"),
        }
    }
}

enum SlotState<T> {
    Pending,
    Done(Result<T, WorkFailure>),
    Taken,
}

struct Slot<T> {
    state: Mutex<SlotState<T>>,
    ready: Condvar,
}

impl<T> Slot<T> {
    fn new() -> Self {
        Self {
            state: Mutex::new(SlotState::Pending),
            ready: Condvar::new(),
        }
    }

    /// First fill wins; later fills are ignored.
    fn fill(&self, result: Result<T, WorkFailure>) {
        let mut state = lock(&self.state);
        if matches!(*state, SlotState::Pending) {
            *state = SlotState::Done(result);
            self.ready.notify_all();
        }
    }
}

fn take<T>(state: &mut SlotState<T>) -> Result<T, WorkFailure> {
    match std::mem::replace(state, SlotState::Taken) {
        SlotState::Done(result) => result,
        SlotState::Pending | SlotState::Taken => Err(WorkFailure::Abandoned),
    }
}

/// Host-side half of the rendezvous. Fills the slot once, or with
/// `Abandoned` when dropped unfilled.
struct Completer<T> {
    slot: Option<Arc<Slot<T>>>,
}

impl<T> Completer<T> {
    fn complete(mut self, result: Result<T, WorkFailure>) {
        if let Some(slot) = self.slot.take() {
            slot.fill(result);
        }
    }
}

impl<T> Drop for Completer<T> {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            slot.fill(Err(WorkFailure::Abandoned));
        }
    }
}

/// A unit of deferred work bound for the host loop thread.
pub struct WorkItem<H> {
    seq: u64,
    job: Job<H>,
}

impl<H: 'static> WorkItem<H> {
    /// Wrap `work` and return the item together with its completion handle.
    pub fn new<T, F>(seq: u64, work: F) -> (Self, WorkHandle<T>)
    where
        F: FnOnce(&mut H) -> T + Send + 'static,
        T: Send + 'static,
    {
        let slot = Arc::new(Slot::new());
        let completer = Completer {
            slot: Some(Arc::clone(&slot)),
        };
        let job: Job<H> = Box::new(move |host: &mut H| {
            let result = panic::catch_unwind(AssertUnwindSafe(|| work(host)));
            completer.complete(
                result.map_err(|payload| WorkFailure::Panicked(PanicPayload::new(payload))),
            );
        });
        (Self { seq, job }, WorkHandle { seq, slot })
    }
}

impl<H> WorkItem<H> {
    #[must_use]
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Execute on the caller's stack. A panic in the work is captured into
    /// the handle and does not unwind through the caller.
    pub fn run(self, host: &mut H) {
        (self.job)(host);
    }
}

impl<H> fmt::Debug for WorkItem<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkItem")
            .field("seq", &self.seq)
            .finish_non_exhaustive()
    }
}

/// Submitter's handle to a [`WorkItem`] result.
pub struct WorkHandle<T> {
    seq: u64,
    slot: Arc<Slot<T>>,
}

impl<T> WorkHandle<T> {
    /// Submission sequence number; strictly increasing per channel.
    #[must_use]
    pub fn seq(&self) -> u64 {
        self.seq
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        !matches!(*lock(&self.slot.state), SlotState::Pending)
    }

    /// Block until the work has run. No timeout.
    pub fn wait(self) -> Result<T, WorkFailure> {
        let state = lock(&self.slot.state);
        let mut state = self
            .slot
            .ready
            .wait_while(state, |state| matches!(state, SlotState::Pending))
            .unwrap_or_else(PoisonError::into_inner);
        take(&mut state)
    }

    /// Block for at most `timeout`.
    ///
    /// On expiry the work is not cancelled; it still runs on the host loop,
    /// but its result is discarded.
    pub fn wait_timeout(self, timeout: Duration) -> Result<T, WorkFailure> {
        let state = lock(&self.slot.state);
        let (mut state, _) = self
            .slot
            .ready
            .wait_timeout_while(state, timeout, |state| matches!(state, SlotState::Pending))
            .unwrap_or_else(PoisonError::into_inner);
        if matches!(*state, SlotState::Pending) {
            return Err(WorkFailure::TimedOut(timeout));
        }
        take(&mut state)
    }
}

impl<T> fmt::Debug for WorkHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkHandle")
            .field("seq", &self.seq)
            .field("complete", &self.is_complete())
            .finish()
    }
}
