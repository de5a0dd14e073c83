//! # Adapters Layer
//!
//! - `memory.rs` - In-memory store for tests and single-process clusters
//! - `rocksdb.rs` - Durable store (feature `rocksdb`)

pub mod memory;
#[cfg(feature = "rocksdb")]
pub mod rocksdb;

pub use memory::InMemoryRecordStore;
#[cfg(feature = "rocksdb")]
pub use self::rocksdb::{RocksDbRecordStore, RocksDbStoreConfig};
