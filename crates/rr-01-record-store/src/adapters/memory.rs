use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use shared_types::{AttributeUpdate, EntityId, EntityRecord, RegionId, StoreError, Version};
use tracing::debug;

use crate::domain::{decide_upsert, plan_conditional_update, UpsertOutcome};
use crate::ports::RecordStore;

/// In-memory record store.
///
/// Every write takes the table's write lock for the whole
/// read-decide-write, which gives the per-id atomicity the port demands.
/// Durable deployments use `RocksDbRecordStore`.
#[derive(Default)]
pub struct InMemoryRecordStore {
    records: RwLock<HashMap<EntityId, EntityRecord>>,
    unavailable: AtomicBool,
    writes: AtomicU64,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate losing or regaining the database.
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::Release);
    }

    /// Number of successful writes.
    #[must_use]
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::Acquire) {
            return Err(StoreError::Unavailable("database unreachable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn conditional_update(
        &self,
        id: EntityId,
        update: AttributeUpdate,
        expected_version: Version,
        region: &RegionId,
        now: DateTime<Utc>,
    ) -> Result<Option<EntityRecord>, StoreError> {
        self.check_available()?;

        let mut records = self.records.write();
        let Some(next) =
            plan_conditional_update(records.get(&id), id, update, expected_version, region, now)
        else {
            debug!(entity_id = %id, expected_version, "Conditional update rejected");
            return Ok(None);
        };

        records.insert(id, next.clone());
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(Some(next))
    }

    async fn upsert_if_newer_version(
        &self,
        record: &EntityRecord,
    ) -> Result<UpsertOutcome, StoreError> {
        self.check_available()?;

        let mut records = self.records.write();
        let outcome = decide_upsert(records.get(&record.id), record);
        if outcome.needs_write() {
            records.insert(record.id, record.clone());
            self.writes.fetch_add(1, Ordering::Relaxed);
        }
        Ok(outcome)
    }

    async fn get_by_id(&self, id: EntityId) -> Result<Option<EntityRecord>, StoreError> {
        self.check_available()?;
        Ok(self.records.read().get(&id).cloned())
    }
}
