//! # Replication Events
//!
//! Defines the event that flows through the replication topic and its wire
//! codec. The payload is the full committed record as JSON, keyed by entity
//! id so that every event for one entity lands on the same partition.

use std::io::Cursor;

use serde::{Deserialize, Serialize};
use shared_types::{BusError, EntityRecord, RegionId};
use thiserror::Error;

/// Errors decoding an inbound log entry. A decode failure marks the entry
/// as poisoned; it never aborts consumption.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The payload is not a valid record.
    #[error("Malformed payload: {0}")]
    Malformed(String),

    /// The partition key disagrees with the record id.
    #[error("Key {key} does not match record id {id}")]
    KeyMismatch { key: String, id: String },
}

/// A committed write, published for the other region to apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReplicationEvent {
    pub record: EntityRecord,
}

impl ReplicationEvent {
    pub fn new(record: EntityRecord) -> Self {
        Self { record }
    }

    /// Partition key: the entity id.
    #[must_use]
    pub fn key(&self) -> String {
        self.record.id.to_key()
    }

    /// Region that produced the write.
    #[must_use]
    pub fn origin(&self) -> &RegionId {
        &self.record.region_origin
    }

    /// Encode as the JSON wire payload.
    pub fn encode(&self) -> Result<Vec<u8>, BusError> {
        serde_json::to_vec(&self.record).map_err(|e| BusError::Encoding(e.to_string()))
    }

    /// Decode a wire payload, checking it against the key it was published under.
    pub fn decode(key: &str, payload: &[u8]) -> Result<Self, DecodeError> {
        let record: EntityRecord =
            serde_json::from_slice(payload).map_err(|e| DecodeError::Malformed(e.to_string()))?;

        if !key.is_empty() && key != record.id.to_key() {
            return Err(DecodeError::KeyMismatch {
                key: key.to_string(),
                id: record.id.to_key(),
            });
        }

        Ok(Self { record })
    }
}

/// Partition assignment for a key.
///
/// MurmurHash3 (x86, 32-bit, seed 0) of the key bytes, so producers built
/// by any toolchain agree.
#[must_use]
pub fn partition_for(key: &str, partitions: u32) -> u32 {
    let hash = murmur3::murmur3_32(&mut Cursor::new(key.as_bytes()), 0).unwrap_or(0);
    hash % partitions.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shared_types::{AttributeUpdate, EntityId};

    fn record(id: u64) -> EntityRecord {
        EntityRecord::created(
            EntityId(id),
            AttributeUpdate::price(100.0),
            RegionId::new("us"),
            Utc::now(),
        )
    }

    #[test]
    fn test_decode_encoded_event() {
        let event = ReplicationEvent::new(record(1));
        let bytes = event.encode().unwrap();

        let decoded = ReplicationEvent::decode("1", &bytes).unwrap();
        assert_eq!(decoded, event);
        assert_eq!(decoded.origin().as_str(), "us");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let result = ReplicationEvent::decode("1", b"{not json");
        assert!(matches!(result, Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn test_decode_rejects_key_mismatch() {
        let bytes = ReplicationEvent::new(record(2)).encode().unwrap();
        let result = ReplicationEvent::decode("3", &bytes);
        assert!(matches!(result, Err(DecodeError::KeyMismatch { .. })));
    }

    #[test]
    fn test_partition_is_stable() {
        let first = partition_for("42", 8);
        assert_eq!(first, partition_for("42", 8));
        assert!(first < 8);
        assert_eq!(partition_for("42", 0), 0);
    }

    #[test]
    fn test_partition_matches_murmur3_reference() {
        // murmur3_32("42") = 3159925814, murmur3_32("property") = 1674245900
        assert_eq!(partition_for("42", 8), 6);
        assert_eq!(partition_for("1", 8), 3);
        assert_eq!(partition_for("1001", 8), 3);
        assert_eq!(partition_for("property", 16), 12);
    }
}
