//! # Ports Layer
//!
//! - `outbound.rs` - Dead-letter sink for entries the coordinator gives up on

pub mod outbound;

pub use outbound::{DeadLetter, DeadLetterReason, DeadLetterSink};
