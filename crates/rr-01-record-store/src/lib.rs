//! # Record Store Adapter (rr-01)
//!
//! Typed access to the durable entity table.
//!
//! ## Operations
//!
//! | Operation | Used by | Semantics |
//! |-----------|---------|-----------|
//! | `conditional_update` | Command Handler | compare-and-swap on `version`; `None` on mismatch or missing id |
//! | `upsert_if_newer_version` | Replication Coordinator | insert if absent, overwrite only if not older |
//! | `get_by_id` | API | point lookup |
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Enforcement Location |
//! |----|-----------|---------------------|
//! | INVARIANT-1 | Stored version only increases | `domain/rules.rs` - `plan_conditional_update()`, `decide_upsert()` |
//! | INVARIANT-2 | Conditional write targets the stored version | `domain/rules.rs` - `plan_conditional_update()` |
//! | INVARIANT-3 | Older replicated versions never regress state | `domain/rules.rs` - `decide_upsert()` |
//!
//! The conditional-update primitive is the only synchronisation point
//! between the local writer and the replication writer. Adapters must make
//! each call atomic with respect to the others.
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! - `domain/` - Pure write-decision rules shared by every adapter
//! - `ports/` - `RecordStore` trait
//! - `adapters/` - In-memory store, RocksDB store (feature `rocksdb`)

pub mod adapters;
pub mod domain;
pub mod ports;

pub use adapters::InMemoryRecordStore;
#[cfg(feature = "rocksdb")]
pub use adapters::{RocksDbRecordStore, RocksDbStoreConfig};
pub use domain::{decide_upsert, plan_conditional_update, UpsertOutcome};
pub use ports::RecordStore;
