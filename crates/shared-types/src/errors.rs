//! # Error Types
//!
//! Defines the collaborator error types shared across subsystems.

use thiserror::Error;

/// Errors raised by a record store adapter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The store could not be reached.
    #[error("Record store unavailable: {0}")]
    Unavailable(String),

    /// A call did not complete within its bound.
    #[error("Record store call timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// A stored value could not be decoded.
    #[error("Corrupt record for key {key}: {reason}")]
    Corrupt { key: String, reason: String },

    /// Database operation failed.
    #[error("Database error: {0}")]
    DatabaseError(String),
}

/// Errors raised by an event bus adapter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BusError {
    /// The broker could not be reached.
    #[error("Event bus unavailable: {0}")]
    Unavailable(String),

    /// A call did not complete within its bound.
    #[error("Event bus call timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The subscription was closed by the broker.
    #[error("Subscription closed")]
    Closed,

    /// The payload could not be encoded.
    #[error("Encoding failed: {0}")]
    Encoding(String),
}

impl BusError {
    /// Whether the failure is a transport problem worth reconnecting for.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout { .. } | Self::Closed)
    }
}
