//! Cross-thread execution bridge for tickbridge.
//!
//! A test thread hands closures to a single-threaded host loop, blocks until
//! the loop has run them on its own stack, and finally tells the loop it may
//! stop. The pieces, leaves first:
//!
//! - [`WorkItem`] / [`WorkHandle`]: one deferred closure and its single-shot result
//! - [`TaskChannel`]: FIFO queue the host loop drains once per tick
//! - [`CompletionGate`]: one-shot latch released on the host loop's exit path
//! - [`TestCounter`]: remaining-suite count that triggers shutdown at zero
//! - [`HostLoop`]: tick driver for any [`Host`]
//! - [`Bridge`]: the orchestrator tying the above together
//!
//! ```text
//! test thread                         host loop thread
//! -----------                         ----------------
//! submit(work) ──► TaskChannel ──► tick(); drain() ──► run work
//! wait() ◄──────────── result slot ◄──────────────────┘
//! on_suite_finished() ─► keep_running=false ─► close; drain; shutdown()
//! finished.wait() ◄──────────────── finished.release()
//! ```

mod bridge;
mod channel;
mod counter;
mod discovery;
mod error;
mod gate;
mod host_loop;
mod signals;
mod sync;
mod work;

pub use bridge::{Bridge, BridgeOptions, DEFAULT_MARKER, SuiteFinish};
pub use channel::{ChannelClosed, TaskChannel};
pub use counter::{Decrement, TestCounter};
pub use discovery::{Discovery, DiscoveryError, StaticDiscovery, count_suites, discover_suites};
pub use error::{BootError, BridgeError};
pub use gate::{CompletionGate, GateTimeout};
pub use host_loop::{DEFAULT_TICK_INTERVAL, Host, HostLoop, LoopExit};
pub use signals::HostSignals;
pub use work::{PanicPayload, WorkFailure, WorkHandle, WorkItem};
