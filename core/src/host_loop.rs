//! Tick driver for a single-threaded host.

use std::thread;
use std::time::{Duration, Instant};

use crate::channel::TaskChannel;
use crate::signals::HostSignals;

/// Default tick cadence (20 ticks per second).
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(50);

/// A long-running application whose state may only be touched from its own
/// loop thread.
///
/// The host does not need to be `Send`: it is constructed on the loop thread
/// and never leaves it. Test work receives `&mut Self` between ticks.
pub trait Host {
    /// Advance the host by one iteration.
    fn tick(&mut self);

    /// Called once on the loop thread after the stop request was observed and
    /// the remaining queued work has run.
    fn shutdown(&mut self) {}
}

/// How a [`HostLoop`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopExit {
    pub ticks: u64,
    /// Items that were still queued when the stop request was observed.
    pub drained_at_shutdown: usize,
}

/// Runs `host.tick()` at a fixed cadence and drains the task channel after
/// every tick until `keep_running` is cleared.
///
/// On stop: close the channel, run whatever is still queued, then call
/// [`Host::shutdown`]. Missed ticks are skipped rather than replayed in a burst.
pub struct HostLoop<'a, H> {
    host: H,
    channel: &'a TaskChannel<H>,
    signals: &'a HostSignals,
    tick_interval: Duration,
}

impl<'a, H: Host> HostLoop<'a, H> {
    pub fn new(host: H, channel: &'a TaskChannel<H>, signals: &'a HostSignals) -> Self {
        Self {
            host,
            channel,
            signals,
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }

    /// Override the tick source cadence.
    pub fn tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    pub fn run(mut self) -> LoopExit {
        let mut ticks: u64 = 0;
        let mut next_tick = Instant::now();

        while self.signals.keep_running() {
            self.host.tick();
            self.channel.drain(&mut self.host);
            ticks += 1;

            let now = Instant::now();
            // An interval too large for `Instant` has no next deadline.
            match next_tick.checked_add(self.tick_interval) {
                Some(next) if next > now => {
                    next_tick = next;
                    thread::sleep(next - now);
                }
                _ => {
                    next_tick = now;
                    thread::yield_now();
                }
            }
        }

        tracing::debug!(ticks, "Stop observed; draining remaining work");
        self.channel.close();
        let drained_at_shutdown = self.channel.drain(&mut self.host);
        self.host.shutdown();

        LoopExit {
            ticks,
            drained_at_shutdown,
        }
    }
}
