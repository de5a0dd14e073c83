//! # Write Rules
//!
//! Pure decisions for the two write paths. Adapters load the current
//! record, ask these functions what to do, and persist the result while
//! holding whatever lock makes the read-decide-write atomic for them.

use chrono::{DateTime, Utc};
use shared_types::{AttributeUpdate, EntityId, EntityRecord, RegionId, Version};

/// Result of a version-guarded upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// No record existed; the incoming one was stored.
    Inserted,
    /// The incoming record replaced an older (or tied) one.
    Updated,
    /// The store already holds exactly this record; nothing was written.
    Unchanged,
    /// The stored record is newer; nothing was written.
    Stale,
}

impl UpsertOutcome {
    /// Whether the store now holds the incoming record.
    #[must_use]
    pub fn is_applied(&self) -> bool {
        !matches!(self, Self::Stale)
    }

    /// Whether the adapter has to persist the incoming record.
    #[must_use]
    pub fn needs_write(&self) -> bool {
        matches!(self, Self::Inserted | Self::Updated)
    }
}

/// Decide the outcome of a compare-and-swap write.
///
/// - Absent id with `expected == 0` creates the entity at version 1.
/// - Present id with `expected == stored.version` produces the next version.
/// - Anything else is a mismatch and yields `None`.
#[must_use]
pub fn plan_conditional_update(
    current: Option<&EntityRecord>,
    id: EntityId,
    update: AttributeUpdate,
    expected: Version,
    region: &RegionId,
    now: DateTime<Utc>,
) -> Option<EntityRecord> {
    match current {
        None if expected == 0 => Some(EntityRecord::created(id, update, region.clone(), now)),
        None => None,
        Some(stored) if stored.version == expected => {
            Some(stored.next_version(update, region.clone(), now))
        }
        Some(_) => None,
    }
}

/// Decide whether a replicated record may replace the stored one.
///
/// Higher version wins. On equal versions the lexicographically greater
/// (or equal) origin wins, so both regions settle on the same record. A
/// replay of the stored record is `Unchanged`.
#[must_use]
pub fn decide_upsert(current: Option<&EntityRecord>, incoming: &EntityRecord) -> UpsertOutcome {
    match current {
        None => UpsertOutcome::Inserted,
        Some(stored) if stored == incoming => UpsertOutcome::Unchanged,
        Some(stored) if incoming.version > stored.version => UpsertOutcome::Updated,
        Some(stored)
            if incoming.version == stored.version
                && incoming.region_origin >= stored.region_origin =>
        {
            UpsertOutcome::Updated
        }
        Some(_) => UpsertOutcome::Stale,
    }
}
