use std::fmt;

use rr_01_record_store::UpsertOutcome;
use serde::Serialize;

/// Coordinator connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum CoordinatorState {
    Disconnected = 0,
    Connecting = 1,
    Subscribed = 2,
    Running = 3,
    Stopped = 4,
}

impl CoordinatorState {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Connecting,
            2 => Self::Subscribed,
            3 => Self::Running,
            4 => Self::Stopped,
            _ => Self::Disconnected,
        }
    }
}

impl fmt::Display for CoordinatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Subscribed => write!(f, "subscribed"),
            Self::Running => write!(f, "running"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// What happened to one inbound entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Written to the store (inserted or overwritten).
    Applied(UpsertOutcome),
    /// The store already holds exactly this record.
    Duplicate,
    /// The store already holds a newer version.
    Stale,
    /// Produced by this region; ignored.
    SelfOrigin,
    /// Could not be decoded; dead-lettered.
    Poisoned,
    /// The store write failed or timed out; dead-lettered.
    StoreFailure,
}

impl ApplyOutcome {
    /// Metric label.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Applied(_) => "applied",
            Self::Duplicate => "duplicate",
            Self::Stale => "stale",
            Self::SelfOrigin => "self_origin",
            Self::Poisoned => "poisoned",
            Self::StoreFailure => "store_failure",
        }
    }
}
