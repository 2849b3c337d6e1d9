//! Bridge lifecycle states.

use std::fmt;

/// Lifecycle of a bridge.
///
/// Transitions are strictly forward:
///
/// ```text
/// NotStarted -> Booting -> Running -> Draining -> Stopped
///                  |                                 ^
///                  +----------- boot failure --------+
/// ```
///
/// Each state is visited at most once. The numeric representation is used to
/// store the state in an atomic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum BridgeState {
    NotStarted = 0,
    Booting = 1,
    Running = 2,
    Draining = 3,
    Stopped = 4,
}

impl BridgeState {
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Decode an atomic value. Unknown values decode as `Stopped`.
    #[must_use]
    pub const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::NotStarted,
            1 => Self::Booting,
            2 => Self::Running,
            3 => Self::Draining,
            _ => Self::Stopped,
        }
    }

    /// Whether `next` is a legal successor of `self`.
    #[must_use]
    pub fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::NotStarted, Self::Booting)
                | (Self::Booting, Self::Running)
                | (Self::Booting, Self::Stopped)
                | (Self::Running, Self::Draining)
                | (Self::Running, Self::Stopped)
                | (Self::Draining, Self::Stopped)
        )
    }

    /// Work may be enqueued while the host loop is alive and has not closed its queue.
    #[must_use]
    pub fn accepts_work(self) -> bool {
        matches!(self, Self::Running | Self::Draining)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not-started",
            Self::Booting => "booting",
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for BridgeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
