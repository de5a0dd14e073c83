//! Command error types.

use shared_types::{BusError, EntityId, EntityRecord, StoreError, Version};
use thiserror::Error;

/// Why a command did not produce a replicated commit.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CommandError {
    /// No usable `X-Request-ID`. Nothing was attempted.
    #[error("Missing request id")]
    MissingRequestId,

    /// The request id already committed, or is being handled right now.
    #[error("Duplicate request id {request_id}")]
    Duplicate { request_id: String },

    /// The stored version is not the expected one, or the id is absent.
    #[error("Version conflict on entity {id}: expected version {expected_version}")]
    VersionConflict { id: EntityId, expected_version: Version },

    /// The store failed before anything was committed.
    #[error("Record store failure: {0}")]
    Store(#[from] StoreError),

    /// The store did not answer in time. Nothing was committed.
    #[error("Record store call timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Committed locally, but the replication event could not be published.
    #[error("Entity {} committed at version {} but not replicated: {source}", .record.id, .record.version)]
    ReplicationPending {
        record: Box<EntityRecord>,
        source: BusError,
    },
}

impl CommandError {
    /// Metric label.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::MissingRequestId => "invalid",
            Self::Duplicate { .. } => "duplicate",
            Self::VersionConflict { .. } => "conflict",
            Self::Store(_) | Self::Timeout { .. } => "store_failure",
            Self::ReplicationPending { .. } => "replication_pending",
        }
    }

    /// Whether the record store holds the write despite the error.
    #[must_use]
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::ReplicationPending { .. })
    }
}
