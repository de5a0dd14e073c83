//! # Domain Layer
//!
//! Marker states and reservation outcomes.

use chrono::{DateTime, Utc};

/// Outcome of trying to claim a request id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reservation {
    /// The caller owns the id and must either `mark_seen` or `release` it.
    Acquired,
    /// Another command holding this id has not finished yet.
    InFlight,
    /// The id already produced a committed effect.
    Committed,
}

impl Reservation {
    /// Whether the caller may proceed with the command.
    #[must_use]
    pub fn is_acquired(&self) -> bool {
        matches!(self, Self::Acquired)
    }
}

/// Stage of a tracked request id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MarkerState {
    InFlight,
    Committed,
}

/// A tracked request id.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Marker {
    pub state: MarkerState,
    /// When the marker entered its current state.
    pub since: DateTime<Utc>,
    /// Distinguishes this marker from an earlier one under the same id in
    /// the eviction queue.
    pub generation: u64,
}

impl Marker {
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> bool {
        now.signed_duration_since(self.since) >= ttl
    }
}
