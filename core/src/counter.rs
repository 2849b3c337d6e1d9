//! Remaining-suite counter that decides when the host loop may stop.

use std::sync::Mutex;

use crate::sync::lock;

/// What a single [`TestCounter::decrement`] observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decrement {
    /// Suites are still outstanding.
    Remaining(i64),
    /// This decrement reached zero (or below); the caller owns shutdown.
    Exhausted { remaining: i64 },
    /// An earlier decrement already reached zero.
    AlreadyExhausted { remaining: i64 },
}

#[derive(Debug, Default)]
struct CounterState {
    remaining: Option<i64>,
    exhausted: bool,
}

/// Count of suites still to finish.
///
/// Initialized once, lazily, from discovery. Only ever decremented. The first
/// decrement that lands at or below zero reports [`Decrement::Exhausted`];
/// every later one reports [`Decrement::AlreadyExhausted`].
#[derive(Debug, Default)]
pub struct TestCounter {
    state: Mutex<CounterState>,
}

impl TestCounter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the starting count. Returns `false` (and keeps the existing value)
    /// if the counter was already initialized.
    pub fn initialize(&self, discovered: i64) -> bool {
        let mut state = lock(&self.state);
        if state.remaining.is_some() {
            return false;
        }
        state.remaining = Some(discovered);
        true
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        lock(&self.state).remaining.is_some()
    }

    #[must_use]
    pub fn remaining(&self) -> Option<i64> {
        lock(&self.state).remaining
    }

    /// Record one finished suite.
    ///
    /// An uninitialized counter is treated as zero.
    pub fn decrement(&self) -> Decrement {
        let mut state = lock(&self.state);
        let remaining = state.remaining.unwrap_or(0).saturating_sub(1);
        state.remaining = Some(remaining);

        if remaining > 0 {
            Decrement::Remaining(remaining)
        } else if state.exhausted {
            Decrement::AlreadyExhausted { remaining }
        } else {
            state.exhausted = true;
            Decrement::Exhausted { remaining }
        }
    }
}
