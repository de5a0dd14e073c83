//! # Outbound Port
//!
//! The record store contract shared by the command path and the
//! replication path.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared_types::{AttributeUpdate, EntityId, EntityRecord, RegionId, StoreError, Version};

use crate::domain::UpsertOutcome;

/// Durable keyed store of entity records.
///
/// Each method must be atomic with respect to every other call on the same
/// id. That atomicity is the only synchronisation between a local writer
/// and the replication writer.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Compare-and-swap write.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(record))` - The new record, version incremented
    /// - `Ok(None)` - Version mismatch, or id absent with a non-zero expected version
    async fn conditional_update(
        &self,
        id: EntityId,
        update: AttributeUpdate,
        expected_version: Version,
        region: &RegionId,
        now: DateTime<Utc>,
    ) -> Result<Option<EntityRecord>, StoreError>;

    /// Insert if absent, overwrite only if `record` is not older than the
    /// stored version.
    async fn upsert_if_newer_version(
        &self,
        record: &EntityRecord,
    ) -> Result<UpsertOutcome, StoreError>;

    /// Point lookup.
    async fn get_by_id(&self, id: EntityId) -> Result<Option<EntityRecord>, StoreError>;
}
