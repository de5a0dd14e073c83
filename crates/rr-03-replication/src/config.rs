//! Replication configuration from environment variables.

use std::env;
use std::time::Duration;

use shared_bus::REPLICATION_TOPIC;
use shared_types::RegionId;

use crate::domain::CircuitBreakerConfig;

/// Reconnect backoff bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffConfig {
    /// Delay before the first retry.
    pub base: Duration,
    /// Upper bound on any single delay.
    pub max: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(500),
            max: Duration::from_secs(30),
        }
    }
}

/// Configuration of one region's coordinator.
#[derive(Debug, Clone)]
pub struct ReplicationConfig {
    /// This process's region. Events from it are discarded.
    pub region: RegionId,
    /// Replication topic.
    pub topic: String,
    pub backoff: BackoffConfig,
    /// Bound on opening a subscription.
    pub connect_timeout: Duration,
    /// Bound on each record store call.
    pub io_timeout: Duration,
    pub breaker: CircuitBreakerConfig,
    /// Resume at the next unprocessed offset on reconnect instead of
    /// replaying from the earliest retained entry.
    pub resume_from_checkpoint: bool,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            region: RegionId::new("us"),
            topic: REPLICATION_TOPIC.to_string(),
            backoff: BackoffConfig::default(),
            connect_timeout: Duration::from_secs(5),
            io_timeout: Duration::from_secs(2),
            breaker: CircuitBreakerConfig::default(),
            resume_from_checkpoint: false,
        }
    }
}

impl ReplicationConfig {
    /// Default configuration for `region`.
    pub fn for_region(region: RegionId) -> Self {
        Self {
            region,
            ..Self::default()
        }
    }

    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `REGION`: This region (default: us)
    /// - `RR_TOPIC`: Replication topic (default: property-updates)
    /// - `RR_BACKOFF_BASE_MS` / `RR_BACKOFF_MAX_MS`: Reconnect backoff (default: 500 / 30000)
    /// - `RR_CONNECT_TIMEOUT_MS`: Subscribe timeout (default: 5000)
    /// - `RR_IO_TIMEOUT_MS`: Store call timeout (default: 2000)
    /// - `RR_BREAKER_THRESHOLD`: Failed attempts before the breaker opens (default: 5)
    /// - `RR_BREAKER_OPEN_SECS`: Breaker cool-down (default: 30)
    /// - `RR_RESUME_FROM_CHECKPOINT`: Resume instead of replaying (default: false)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let breaker_defaults = CircuitBreakerConfig::default();

        Self {
            region: env::var("REGION")
                .map(RegionId::new)
                .unwrap_or(defaults.region),

            topic: env::var("RR_TOPIC").unwrap_or(defaults.topic),

            backoff: BackoffConfig {
                base: env_millis("RR_BACKOFF_BASE_MS").unwrap_or(defaults.backoff.base),
                max: env_millis("RR_BACKOFF_MAX_MS").unwrap_or(defaults.backoff.max),
            },

            connect_timeout: env_millis("RR_CONNECT_TIMEOUT_MS")
                .unwrap_or(defaults.connect_timeout),

            io_timeout: env_millis("RR_IO_TIMEOUT_MS").unwrap_or(defaults.io_timeout),

            breaker: CircuitBreakerConfig {
                failure_threshold: env::var("RR_BREAKER_THRESHOLD")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(breaker_defaults.failure_threshold),
                open_timeout: env::var("RR_BREAKER_OPEN_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .map(Duration::from_secs)
                    .unwrap_or(breaker_defaults.open_timeout),
                ..breaker_defaults
            },

            resume_from_checkpoint: env::var("RR_RESUME_FROM_CHECKPOINT")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(false),
        }
    }
}

fn env_millis(name: &str) -> Option<Duration> {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_millis)
}
