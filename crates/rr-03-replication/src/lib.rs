//! # Replication Coordinator (rr-03)
//!
//! The consumer side of replication. Drains the replication topic, drops
//! events this region produced, and merges the rest into the record store
//! by version.
//!
//! ## State Machine
//!
//! ```text
//! Disconnected -> Connecting -> Subscribed -> Running
//!                     ^                          |
//!                     +---- transport failure ---+
//!
//! any state --shutdown--> Stopped
//! ```
//!
//! Connection attempts never give up. Failed attempts are spaced by capped
//! exponential backoff with jitter; repeated failures open a circuit
//! breaker that pauses attempts for a cool-down period.
//!
//! ## Apply Algorithm
//!
//! 1. Undecodable entry: dead-letter, continue
//! 2. `region_origin == own region`: discard
//! 3. Version-guarded upsert (`rr-01`); older versions are rejected
//! 4. On apply, advance the replication lag state to the event's `updated_at`
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Enforcement Location |
//! |----|-----------|---------------------|
//! | INVARIANT-1 | Self-originated events are never applied | `service.rs` - `apply_entry()` |
//! | INVARIANT-2 | A stale event never moves state or lag | `service.rs` - `apply_entry()` |
//! | INVARIANT-3 | One bad event never stops consumption | `service.rs` - `consume()` |
//! | INVARIANT-4 | Reconnects are bounded by `backoff.max` between attempts | `domain/backoff.rs` |

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use adapters::{BusDeadLetterSink, InMemoryDeadLetterSink, LoggingDeadLetterSink};
pub use config::{BackoffConfig, ReplicationConfig};
pub use domain::{
    ApplyOutcome, CircuitBreaker, CircuitBreakerConfig, CircuitState, CoordinatorState,
    ExponentialBackoff, LagReport, LagReporter, ReplicationLagState,
};
pub use error::ReplicationError;
pub use ports::{DeadLetter, DeadLetterReason, DeadLetterSink};
pub use service::{CoordinatorStatus, ReplicationCoordinator, StatusSnapshot};
