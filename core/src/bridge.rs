//! The test-facing orchestrator.
//!
//! A [`Bridge`] owns the task channel, the host signals and the suite
//! counter for exactly one run. It boots the host loop thread on first use,
//! forwards test bodies to it, and stops it once the last discovered suite
//! has finished.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::mpsc::{self, SyncSender};
use std::sync::{Arc, Mutex, OnceLock};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

use tickbridge_types::{BridgeState, SuiteRef};

use crate::channel::TaskChannel;
use crate::counter::{Decrement, TestCounter};
use crate::discovery::{self, Discovery};
use crate::error::{BootError, BridgeError};
use crate::gate::GateTimeout;
use crate::host_loop::{DEFAULT_TICK_INTERVAL, Host, HostLoop};
use crate::signals::HostSignals;
use crate::sync::lock;
use crate::work::WorkHandle;

/// Marker a suite must carry to be run through the host loop.
pub const DEFAULT_MARKER: &str = "host-loop";

const HOST_THREAD_NAME: &str = "host-loop";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeOptions {
    pub marker: String,
    pub tick_interval: Duration,
    /// Upper bound on waiting for the host loop to stop. `None` waits forever.
    pub shutdown_timeout: Option<Duration>,
    /// Upper bound on waiting for one work item. `None` waits forever.
    pub work_timeout: Option<Duration>,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            marker: DEFAULT_MARKER.to_string(),
            tick_interval: DEFAULT_TICK_INTERVAL,
            shutdown_timeout: None,
            work_timeout: None,
        }
    }
}

/// What [`Bridge::on_suite_finished`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuiteFinish {
    /// More suites are expected; the host loop keeps running.
    Continue { remaining: i64 },
    /// This was the last suite. The host loop has stopped.
    Stopped,
    /// Shutdown had already been triggered by an earlier suite.
    AlreadyStopped,
}

pub struct Bridge<H> {
    channel: TaskChannel<H>,
    signals: HostSignals,
    counter: TestCounter,
    state: AtomicU8,
    discovery: Box<dyn Discovery>,
    options: BridgeOptions,
    // Serializes boot against stop requests.
    boot_lock: Mutex<()>,
    host_thread: Mutex<Option<JoinHandle<()>>>,
    host_panicked: AtomicBool,
    host_thread_id: OnceLock<ThreadId>,
}

impl<H> Bridge<H> {
    pub fn new(discovery: impl Discovery + 'static, options: BridgeOptions) -> Arc<Self> {
        Arc::new(Self {
            channel: TaskChannel::new(),
            signals: HostSignals::new(),
            counter: TestCounter::new(),
            state: AtomicU8::new(BridgeState::NotStarted.as_u8()),
            discovery: Box::new(discovery),
            options,
            boot_lock: Mutex::new(()),
            host_thread: Mutex::new(None),
            host_panicked: AtomicBool::new(false),
            host_thread_id: OnceLock::new(),
        })
    }

    #[must_use]
    pub fn state(&self) -> BridgeState {
        BridgeState::from_u8(self.state.load(Ordering::Acquire))
    }

    #[must_use]
    pub fn options(&self) -> &BridgeOptions {
        &self.options
    }

    #[must_use]
    pub fn signals(&self) -> &HostSignals {
        &self.signals
    }

    #[must_use]
    pub fn channel(&self) -> &TaskChannel<H> {
        &self.channel
    }

    /// Suites left before shutdown. `None` until the first suite finished.
    #[must_use]
    pub fn counter_remaining(&self) -> Option<i64> {
        self.counter.remaining()
    }

    /// Whether the caller is running on the host loop thread.
    #[must_use]
    pub fn is_host_thread(&self) -> bool {
        self.host_thread_id
            .get()
            .is_some_and(|id| *id == thread::current().id())
    }

    /// Suites carrying this bridge's marker, in run order.
    pub fn discover_suites(&self) -> Vec<SuiteRef> {
        discovery::discover_suites(&*self.discovery, &self.options.marker)
    }

    /// Record one finished suite.
    ///
    /// The counter is initialized from discovery on the first call. When it
    /// reaches zero the host loop is stopped and this call blocks until the
    /// loop has drained and released its finished gate.
    pub fn on_suite_finished(&self) -> Result<SuiteFinish, BridgeError> {
        if !self.counter.is_initialized() {
            let discovered = discovery::count_suites(&*self.discovery, &self.options.marker);
            if self.counter.initialize(discovered) {
                tracing::info!(discovered, marker = %self.options.marker, "Suite counter initialized");
            }
        }

        match self.counter.decrement() {
            Decrement::Remaining(remaining) => {
                tracing::debug!(remaining, "Suite finished");
                Ok(SuiteFinish::Continue { remaining })
            }
            Decrement::Exhausted { remaining } => {
                tracing::info!(remaining, "Last suite finished; stopping host loop");
                self.shutdown()?;
                Ok(SuiteFinish::Stopped)
            }
            Decrement::AlreadyExhausted { remaining } => {
                tracing::debug!(remaining, "Suite finished after shutdown was triggered");
                Ok(SuiteFinish::AlreadyStopped)
            }
        }
    }

    /// Stop the host loop and wait for it to finish.
    ///
    /// Safe to call repeatedly and before boot. Honors `shutdown_timeout`.
    pub fn shutdown(&self) -> Result<(), BridgeError> {
        self.request_stop();
        self.await_stopped()
    }

    fn request_stop(&self) {
        let _boot = lock(&self.boot_lock);
        match self.state() {
            BridgeState::NotStarted => {
                // Never booted: nothing will release the gate but us.
                self.channel.close();
                self.signals.request_stop();
                self.state
                    .store(BridgeState::Stopped.as_u8(), Ordering::Release);
                self.signals.finished().release();
                tracing::info!("Bridge stopped before the host loop was booted");
                return;
            }
            BridgeState::Running => {
                self.advance(BridgeState::Draining);
            }
            BridgeState::Booting | BridgeState::Draining | BridgeState::Stopped => {}
        }
        if self.signals.request_stop() {
            tracing::debug!("Stop flag set");
        }
    }

    fn await_stopped(&self) -> Result<(), BridgeError> {
        if self.is_host_thread() {
            return Err(BridgeError::Reentrant);
        }

        match self.options.shutdown_timeout {
            Some(timeout) => self
                .signals
                .finished()
                .wait_timeout(timeout)
                .map_err(|GateTimeout(waited)| {
                    tracing::error!(?waited, "Host loop did not stop in time");
                    BridgeError::ShutdownTimedOut(waited)
                })?,
            None => self.signals.finished().wait(),
        }

        let handle = lock(&self.host_thread).take();
        if let Some(handle) = handle
            && handle.join().is_err()
        {
            self.host_panicked.store(true, Ordering::Release);
        }

        if self.host_panicked.load(Ordering::Acquire) {
            Err(BridgeError::HostPanicked)
        } else {
            Ok(())
        }
    }

    /// Move to `next` if that is a legal transition from the current state.
    fn advance(&self, next: BridgeState) -> bool {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            let from = BridgeState::from_u8(current);
            if !from.can_advance_to(next) {
                return false;
            }
            match self.state.compare_exchange(
                current,
                next.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    tracing::info!(from = %from, to = %next, "Bridge state changed");
                    return true;
                }
                Err(actual) => current = actual,
            }
        }
    }
}

impl<H: Host + 'static> Bridge<H> {
    /// Start the host loop thread, building the host there with `factory`.
    ///
    /// Returns once the host is constructed and the loop is accepting work.
    /// Calling again while running is a no-op; calling after the bridge has
    /// stopped is an error.
    pub fn boot<F>(self: &Arc<Self>, factory: F) -> Result<(), BridgeError>
    where
        F: FnOnce() -> Result<H, BootError> + Send + 'static,
    {
        let _boot = lock(&self.boot_lock);
        match self.state() {
            BridgeState::NotStarted => {}
            BridgeState::Running | BridgeState::Draining => return Ok(()),
            state @ (BridgeState::Booting | BridgeState::Stopped) => {
                return Err(BridgeError::NotRunning { state });
            }
        }
        self.advance(BridgeState::Booting);

        let (ready_tx, ready_rx) = mpsc::sync_channel(1);
        let bridge = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name(HOST_THREAD_NAME.to_string())
            .spawn(move || bridge.host_main(factory, ready_tx));

        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                self.advance(BridgeState::Stopped);
                self.channel.close();
                self.signals.finished().release();
                tracing::error!("Failed to spawn host loop thread: {e}");
                return Err(BootError::new(format!("could not spawn host loop thread: {e}")).into());
            }
        };

        match ready_rx.recv() {
            Ok(Ok(())) => {
                *lock(&self.host_thread) = Some(handle);
                Ok(())
            }
            Ok(Err(err)) => {
                let _ = handle.join();
                tracing::error!(error = %err, "Host failed to boot");
                Err(err.into())
            }
            // Sender dropped without a report: the factory panicked.
            Err(_) => {
                let _ = handle.join();
                tracing::error!("Host factory panicked during boot");
                Err(BootError::new("host factory panicked").into())
            }
        }
    }

    /// Enqueue `work` for the host loop without waiting for it.
    pub fn submit<T, F>(&self, work: F) -> Result<WorkHandle<T>, BridgeError>
    where
        F: FnOnce(&mut H) -> T + Send + 'static,
        T: Send + 'static,
    {
        let state = self.state();
        if !state.accepts_work() {
            return Err(BridgeError::NotRunning { state });
        }
        self.channel.submit(work).map_err(|_| BridgeError::NotRunning {
            state: self.state(),
        })
    }

    /// Run `work` on the host loop and block until it has finished.
    ///
    /// Honors `work_timeout`. Must not be called from the host loop thread.
    pub fn execute<T, F>(&self, work: F) -> Result<T, BridgeError>
    where
        F: FnOnce(&mut H) -> T + Send + 'static,
        T: Send + 'static,
    {
        if self.is_host_thread() {
            return Err(BridgeError::Reentrant);
        }
        let handle = self.submit(work)?;
        let result = match self.options.work_timeout {
            Some(timeout) => handle.wait_timeout(timeout),
            None => handle.wait(),
        };
        Ok(result?)
    }

    fn host_main<F>(self: Arc<Self>, factory: F, ready: SyncSender<Result<(), BootError>>)
    where
        F: FnOnce() -> Result<H, BootError>,
    {
        let _ = self.host_thread_id.set(thread::current().id());
        let _exit = ExitGuard { bridge: &*self };

        let host = match factory() {
            Ok(host) => host,
            Err(err) => {
                let _ = ready.send(Err(err));
                return;
            }
        };

        self.advance(BridgeState::Running);
        let _ = ready.send(Ok(()));
        drop(ready);

        let exit = HostLoop::new(host, &self.channel, &self.signals)
            .tick_interval(self.options.tick_interval)
            .run();
        tracing::info!(
            ticks = exit.ticks,
            drained = exit.drained_at_shutdown,
            "Host loop exited"
        );
    }
}

impl<H> fmt::Debug for Bridge<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bridge")
            .field("state", &self.state())
            .field("marker", &self.options.marker)
            .field("queued", &self.channel.len())
            .field("remaining", &self.counter.remaining())
            .finish_non_exhaustive()
    }
}

/// Runs on the host loop thread however it leaves: normal stop, boot
/// failure, or panic. Drops whatever is still queued and releases the
/// finished gate so no waiter is left hanging.
struct ExitGuard<'a, H> {
    bridge: &'a Bridge<H>,
}

impl<H> Drop for ExitGuard<'_, H> {
    fn drop(&mut self) {
        let bridge = self.bridge;
        if thread::panicking() {
            bridge.host_panicked.store(true, Ordering::Release);
            tracing::error!("Host loop thread panicked");
        }
        bridge.signals.request_stop();
        let abandoned = bridge.channel.abandon_pending();
        if abandoned > 0 {
            tracing::warn!(abandoned, "Dropped queued work the host loop never ran");
        }
        bridge.advance(BridgeState::Stopped);
        bridge.signals.finished().release();
    }
}
