//! # Core Domain Entities
//!
//! Defines the replicated unit of state and the identifiers it is keyed by.
//!
//! ## Ordering Authority
//!
//! `version` is the optimistic-concurrency token and the only ordering
//! authority between regions. `updated_at` is stamped by the writing region's
//! clock and is informational: clocks in two regions may be skewed.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Optimistic-concurrency token. Only ever increases for a given id.
pub type Version = u64;

/// Stable identity of an entity; unique key of the record store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u64);

impl EntityId {
    /// Key bytes used for partitioning and storage.
    #[must_use]
    pub fn to_key(&self) -> String {
        self.0.to_string()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntityId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

/// Identifier of a writable region (e.g. `us`, `eu`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionId(String);

impl RegionId {
    /// Create a region identifier. Surrounding whitespace is dropped.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into().trim().to_string())
    }

    /// The region name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RegionId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Mutable attributes carried by a command.
///
/// `price` is always written. Omitted room counts keep their stored value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttributeUpdate {
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bedrooms: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bathrooms: Option<u32>,
}

impl AttributeUpdate {
    /// Update that only changes the price.
    #[must_use]
    pub fn price(price: f64) -> Self {
        Self {
            price,
            bedrooms: None,
            bathrooms: None,
        }
    }
}

/// The replicated unit of state.
///
/// The serialized form is also the replication event payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub id: EntityId,
    pub price: f64,
    #[serde(default)]
    pub bedrooms: u32,
    #[serde(default)]
    pub bathrooms: u32,
    /// Region whose write produced this version.
    pub region_origin: RegionId,
    pub version: Version,
    /// Commit time in the writing region. Informational only.
    pub updated_at: DateTime<Utc>,
}

impl EntityRecord {
    /// First version of an entity created by a local write.
    #[must_use]
    pub fn created(
        id: EntityId,
        update: AttributeUpdate,
        region: RegionId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            price: update.price,
            bedrooms: update.bedrooms.unwrap_or_default(),
            bathrooms: update.bathrooms.unwrap_or_default(),
            region_origin: region,
            version: 1,
            updated_at: now,
        }
    }

    /// The next version of this record after a local write.
    #[must_use]
    pub fn next_version(
        &self,
        update: AttributeUpdate,
        region: RegionId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: self.id,
            price: update.price,
            bedrooms: update.bedrooms.unwrap_or(self.bedrooms),
            bathrooms: update.bathrooms.unwrap_or(self.bathrooms),
            region_origin: region,
            version: self.version.saturating_add(1),
            updated_at: now,
        }
    }

    /// Whether this record originated in `region`.
    #[must_use]
    pub fn originated_in(&self, region: &RegionId) -> bool {
        &self.region_origin == region
    }
}
