//! # Adapters Layer
//!
//! Dead-letter sink implementations.

pub mod dead_letter;

pub use dead_letter::{BusDeadLetterSink, InMemoryDeadLetterSink, LoggingDeadLetterSink};
