//! FIFO task queue between the test thread and the host loop thread.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Mutex;

use thiserror::Error;

use crate::sync::lock;
use crate::work::{WorkHandle, WorkItem};

#[derive(Debug, Clone, Copy, Error)]
#[error("task channel is closed")]
pub struct ChannelClosed;

struct ChannelState<H> {
    queue: VecDeque<WorkItem<H>>,
    next_seq: u64,
    closed: bool,
}

/// Unbounded FIFO of [`WorkItem`]s.
///
/// Any thread may submit; only the host loop thread drains. Items are popped
/// under the lock and executed after it is released, so work may itself submit
/// follow-up items without deadlocking.
pub struct TaskChannel<H> {
    state: Mutex<ChannelState<H>>,
}

impl<H> TaskChannel<H> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ChannelState {
                queue: VecDeque::new(),
                next_seq: 0,
                closed: false,
            }),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.state).queue.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        lock(&self.state).queue.is_empty()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        lock(&self.state).closed
    }

    /// Reject further submissions. Returns `true` if this call closed it.
    ///
    /// Items already queued stay queued and can still be drained.
    pub fn close(&self) -> bool {
        let mut state = lock(&self.state);
        !std::mem::replace(&mut state.closed, true)
    }

    /// Close the channel and drop every queued item unexecuted.
    ///
    /// Each dropped item resolves its handle to `Abandoned`. Returns how many
    /// items were dropped.
    pub fn abandon_pending(&self) -> usize {
        let abandoned: Vec<WorkItem<H>> = {
            let mut state = lock(&self.state);
            state.closed = true;
            state.queue.drain(..).collect()
        };
        // Dropped outside the queue lock: dropping fills the result slots.
        abandoned.len()
    }

    fn pop(&self) -> Option<WorkItem<H>> {
        lock(&self.state).queue.pop_front()
    }

    /// Pop the oldest item and run it on the caller's stack.
    ///
    /// Must only be called from the host loop thread. Returns `false` when
    /// the queue was empty.
    pub fn drain_one(&self, host: &mut H) -> bool {
        let Some(item) = self.pop() else {
            return false;
        };
        tracing::debug!(seq = item.seq(), "Running work item on host loop");
        item.run(host);
        true
    }

    /// Run every item that was queued when the call started.
    ///
    /// Items submitted while draining wait for the next call, so one tick can
    /// never be starved by work that keeps enqueueing more work.
    pub fn drain(&self, host: &mut H) -> usize {
        let pending = self.len();
        let mut ran = 0;
        while ran < pending && self.drain_one(host) {
            ran += 1;
        }
        ran
    }
}

impl<H: 'static> TaskChannel<H> {
    /// Enqueue `work` and return its completion handle.
    pub fn submit<T, F>(&self, work: F) -> Result<WorkHandle<T>, ChannelClosed>
    where
        F: FnOnce(&mut H) -> T + Send + 'static,
        T: Send + 'static,
    {
        let mut state = lock(&self.state);
        if state.closed {
            return Err(ChannelClosed);
        }
        let seq = state.next_seq;
        state.next_seq += 1;
        let (item, handle) = WorkItem::new(seq, work);
        state.queue.push_back(item);
        Ok(handle)
    }
}

impl<H> Default for TaskChannel<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> fmt::Debug for TaskChannel<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock(&self.state);
        f.debug_struct("TaskChannel")
            .field("pending", &state.queue.len())
            .field("closed", &state.closed)
            .finish()
    }
}
