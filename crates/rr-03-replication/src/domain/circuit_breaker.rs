//! Circuit breaker around event log connection attempts.
//!
//! # Circuit Breaker States
//!
//! ```text
//!      ┌──────────┐          ┌──────────┐          ┌──────────┐
//!      │  CLOSED  │ ───────► │   OPEN   │ ───────► │HALF-OPEN │
//!      │ (normal) │ failures │ (pause)  │  timeout │  (probe) │
//!      └──────────┘          └──────────┘          └──────────┘
//!            ▲                     ▲                     │
//!            │                     └──── probe fails ────┤
//!            └────────────── probe succeeds ─────────────┘
//! ```
//!
//! # Configuration
//!
//! - `failure_threshold`: Consecutive failures before opening (default: 5)
//! - `success_threshold`: Successful probes in half-open before closing (default: 1)
//! - `open_timeout`: Time before a probe is allowed (default: 30s)

use std::fmt;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{info, warn};

/// Circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CircuitState {
    /// Normal operation - attempts pass through
    Closed,
    /// Attempts are paused
    Open,
    /// A probe attempt is allowed
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
            CircuitState::HalfOpen => write!(f, "half-open"),
        }
    }
}

/// Circuit breaker configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Number of consecutive failures before opening the circuit
    pub failure_threshold: u32,
    /// Number of successes in half-open state before closing
    pub success_threshold: u32,
    /// Duration before half-open from open state
    pub open_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 1,
            open_timeout: Duration::from_secs(30),
        }
    }
}

struct Circuit {
    state: CircuitState,
    failure_count: u32,
    half_open_successes: u32,
    opened_at: Option<Instant>,
}

/// Single-circuit breaker.
pub struct CircuitBreaker {
    circuit: Mutex<Circuit>,
    config: CircuitBreakerConfig,
    name: String,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            circuit: Mutex::new(Circuit {
                state: CircuitState::Closed,
                failure_count: 0,
                half_open_successes: 0,
                opened_at: None,
            }),
            config,
            name: name.into(),
        }
    }

    /// Check if an attempt should be made now.
    ///
    /// Moves an expired open circuit to half-open.
    pub fn should_allow(&self) -> bool {
        let mut circuit = self.circuit.lock();
        match circuit.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let expired = circuit
                    .opened_at
                    .map_or(true, |at| at.elapsed() >= self.config.open_timeout);
                if expired {
                    info!(circuit = %self.name, "Circuit breaker transitioning to half-open");
                    circuit.state = CircuitState::HalfOpen;
                    circuit.half_open_successes = 0;
                }
                expired
            }
        }
    }

    /// Time until an open circuit allows a probe.
    #[must_use]
    pub fn remaining_open(&self) -> Option<Duration> {
        let circuit = self.circuit.lock();
        match (circuit.state, circuit.opened_at) {
            (CircuitState::Open, Some(at)) => {
                Some(self.config.open_timeout.saturating_sub(at.elapsed()))
            }
            _ => None,
        }
    }

    /// Record a successful attempt
    pub fn record_success(&self) {
        let mut circuit = self.circuit.lock();
        match circuit.state {
            CircuitState::Closed => {
                circuit.failure_count = 0;
            }
            CircuitState::HalfOpen => {
                circuit.half_open_successes += 1;
                if circuit.half_open_successes >= self.config.success_threshold {
                    info!(circuit = %self.name, "Circuit breaker closing after successful probe");
                    circuit.state = CircuitState::Closed;
                    circuit.failure_count = 0;
                    circuit.opened_at = None;
                }
            }
            CircuitState::Open => {}
        }
    }

    /// Record a failed attempt
    pub fn record_failure(&self) {
        let mut circuit = self.circuit.lock();
        match circuit.state {
            CircuitState::Closed => {
                circuit.failure_count += 1;
                if circuit.failure_count >= self.config.failure_threshold {
                    warn!(
                        circuit = %self.name,
                        failures = circuit.failure_count,
                        timeout_secs = self.config.open_timeout.as_secs(),
                        "Circuit breaker opening due to failures"
                    );
                    circuit.state = CircuitState::Open;
                    circuit.opened_at = Some(Instant::now());
                }
            }
            CircuitState::HalfOpen => {
                warn!(circuit = %self.name, "Circuit breaker reopening after probe failure");
                circuit.state = CircuitState::Open;
                circuit.opened_at = Some(Instant::now());
                circuit.half_open_successes = 0;
            }
            CircuitState::Open => {
                circuit.opened_at = Some(Instant::now());
            }
        }
    }

    /// Get the current state
    #[must_use]
    pub fn state(&self) -> CircuitState {
        self.circuit.lock().state
    }
}
