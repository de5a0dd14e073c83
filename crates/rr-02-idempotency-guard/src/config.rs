//! Idempotency guard configuration from environment variables.

use std::env;

use chrono::Duration;

/// Default marker lifetime: one day.
pub const DEFAULT_TTL_SECS: u64 = 86_400;

/// Default cap on committed markers.
pub const DEFAULT_MAX_ENTRIES: usize = 1_000_000;

/// Bounds on the guard's memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdempotencyConfig {
    /// How long a marker rejects retries.
    pub ttl_secs: u64,
    /// Maximum committed markers retained. Oldest are evicted first.
    pub max_entries: usize,
}

impl Default for IdempotencyConfig {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_TTL_SECS,
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

impl IdempotencyConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `RR_IDEMPOTENCY_TTL_SECS`: Marker lifetime (default: 86400)
    /// - `RR_IDEMPOTENCY_MAX_ENTRIES`: Marker cap (default: 1000000)
    pub fn from_env() -> Self {
        Self {
            ttl_secs: env::var("RR_IDEMPOTENCY_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_TTL_SECS),

            max_entries: env::var("RR_IDEMPOTENCY_MAX_ENTRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_MAX_ENTRIES),
        }
    }

    /// Marker lifetime as a duration.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        let secs = i64::try_from(self.ttl_secs)
            .unwrap_or(i64::MAX)
            .min(i64::MAX / 1_000);
        Duration::seconds(secs)
    }
}
