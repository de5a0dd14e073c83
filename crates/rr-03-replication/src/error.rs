//! Replication error types.

use shared_types::BusError;
use thiserror::Error;

/// Failures of the consume loop. All of them lead to a reconnect; none is
/// fatal.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReplicationError {
    /// The broker refused the subscription.
    #[error("Subscribe failed: {0}")]
    Subscribe(BusError),

    /// The subscription did not open within its bound.
    #[error("Subscribe timed out after {timeout_ms}ms")]
    ConnectTimeout { timeout_ms: u64 },

    /// An open subscription failed.
    #[error("Subscription lost: {0}")]
    Transport(BusError),

    /// The event log ended the subscription.
    #[error("Event log closed the subscription")]
    EndOfStream,
}
