//! # RocksDB Record Store
//!
//! Durable implementation of `RecordStore`. Records are stored as JSON
//! under the key `entity:{id}` in the default column family.
//!
//! RocksDB has no native compare-and-swap, so writes are serialised by a
//! mutex around the read-decide-write. Reads go straight to the database.
//! All database work happens inside `spawn_blocking`.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rocksdb::{Options, WriteOptions, DB};
use shared_types::{AttributeUpdate, EntityId, EntityRecord, RegionId, StoreError, Version};
use tracing::{debug, info};

use crate::domain::{decide_upsert, plan_conditional_update, UpsertOutcome};
use crate::ports::RecordStore;

const KEY_PREFIX: &str = "entity:";

/// RocksDB configuration
#[derive(Debug, Clone)]
pub struct RocksDbStoreConfig {
    /// Path to the database directory
    pub path: String,
    /// Write buffer size in bytes (default: 16MB)
    pub write_buffer_size: usize,
    /// Enable fsync after each write (default: true for durability)
    pub sync_writes: bool,
}

impl Default for RocksDbStoreConfig {
    fn default() -> Self {
        Self {
            path: "./data/records".to_string(),
            write_buffer_size: 16 * 1024 * 1024,
            sync_writes: true,
        }
    }
}

impl RocksDbStoreConfig {
    /// Create config for testing (small buffers, no sync)
    pub fn for_testing(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_string_lossy().to_string(),
            write_buffer_size: 1024 * 1024,
            sync_writes: false,
        }
    }
}

/// RocksDB-backed record store
///
/// Every call runs on the blocking pool, so callers can bound it with
/// `tokio::time::timeout` and synced writes never stall a runtime worker.
pub struct RocksDbRecordStore {
    inner: Arc<RocksDbInner>,
}

struct RocksDbInner {
    db: DB,
    write_lock: Mutex<()>,
    config: RocksDbStoreConfig,
    writes: AtomicU64,
}

impl RocksDbRecordStore {
    /// Open or create the database
    pub fn open(config: RocksDbStoreConfig) -> Result<Self, StoreError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_write_buffer_size(config.write_buffer_size);
        opts.set_compression_type(rocksdb::DBCompressionType::Snappy);

        let db = DB::open(&opts, &config.path)
            .map_err(|e| StoreError::Unavailable(format!("Failed to open RocksDB: {}", e)))?;

        info!(path = %config.path, "Record store opened");

        Ok(Self {
            inner: Arc::new(RocksDbInner {
                db,
                write_lock: Mutex::new(()),
                config,
                writes: AtomicU64::new(0),
            }),
        })
    }

    /// Number of successful writes since open.
    #[must_use]
    pub fn writes(&self) -> u64 {
        self.inner.writes.load(Ordering::Relaxed)
    }

    /// Run `op` against the database on the blocking pool.
    async fn blocking<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&RocksDbInner) -> Result<T, StoreError> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || op(&inner))
            .await
            .map_err(|e| StoreError::Unavailable(format!("RocksDB task failed: {}", e)))?
    }
}

impl RocksDbInner {
    fn key(id: EntityId) -> Vec<u8> {
        format!("{KEY_PREFIX}{id}").into_bytes()
    }

    fn load(&self, id: EntityId) -> Result<Option<EntityRecord>, StoreError> {
        let Some(bytes) = self
            .db
            .get(Self::key(id))
            .map_err(|e| StoreError::DatabaseError(format!("RocksDB get failed: {}", e)))?
        else {
            return Ok(None);
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| StoreError::Corrupt {
                key: id.to_key(),
                reason: e.to_string(),
            })
    }

    fn save(&self, record: &EntityRecord) -> Result<(), StoreError> {
        let value = serde_json::to_vec(record).map_err(|e| StoreError::Corrupt {
            key: record.id.to_key(),
            reason: e.to_string(),
        })?;

        let mut write_opts = WriteOptions::default();
        write_opts.set_sync(self.config.sync_writes);

        self.db
            .put_opt(Self::key(record.id), value, &write_opts)
            .map_err(|e| StoreError::DatabaseError(format!("RocksDB put failed: {}", e)))?;
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn conditional_update(
        &self,
        id: EntityId,
        update: AttributeUpdate,
        expected_version: Version,
        region: &RegionId,
        now: DateTime<Utc>,
    ) -> Result<Option<EntityRecord>, StoreError> {
        let _guard = self.write_lock.lock();
        let current = self.load(id)?;

        let Some(next) =
            plan_conditional_update(current.as_ref(), id, update, expected_version, region, now)
        else {
            debug!(entity_id = %id, expected_version, "Conditional update rejected");
            return Ok(None);
        };

        self.save(&next)?;
        Ok(Some(next))
    }

    fn upsert_if_newer_version(&self, record: &EntityRecord) -> Result<UpsertOutcome, StoreError> {
        let _guard = self.write_lock.lock();
        let current = self.load(record.id)?;

        let outcome = decide_upsert(current.as_ref(), record);
        if outcome.needs_write() {
            self.save(record)?;
        }
        Ok(outcome)
    }
}

#[async_trait]
impl RecordStore for RocksDbRecordStore {
    async fn conditional_update(
        &self,
        id: EntityId,
        update: AttributeUpdate,
        expected_version: Version,
        region: &RegionId,
        now: DateTime<Utc>,
    ) -> Result<Option<EntityRecord>, StoreError> {
        let region = region.clone();
        self.blocking(move |db| db.conditional_update(id, update, expected_version, &region, now))
            .await
    }

    async fn upsert_if_newer_version(
        &self,
        record: &EntityRecord,
    ) -> Result<UpsertOutcome, StoreError> {
        let record = record.clone();
        self.blocking(move |db| db.upsert_if_newer_version(&record)).await
    }

    async fn get_by_id(&self, id: EntityId) -> Result<Option<EntityRecord>, StoreError> {
        self.blocking(move |db| db.load(id)).await
    }
}
