//! # Ports Layer
//!
//! - `outbound.rs` - Driven port the command and replication paths write through

pub mod outbound;

pub use outbound::RecordStore;
