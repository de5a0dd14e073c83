//! # Domain Layer
//!
//! - `state.rs` - Coordinator states and apply outcomes
//! - `backoff.rs` - Capped exponential backoff with jitter
//! - `circuit_breaker.rs` - Connection circuit breaker
//! - `lag.rs` - Replication lag state and reporter

pub mod backoff;
pub mod circuit_breaker;
pub mod lag;
pub mod state;

pub use backoff::ExponentialBackoff;
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use lag::{LagReport, LagReporter, ReplicationLagState};
pub use state::{ApplyOutcome, CoordinatorState};
