//! Command handler configuration from environment variables.

use std::env;
use std::time::Duration;

use shared_bus::REPLICATION_TOPIC;
use shared_types::RegionId;

/// Configuration of one region's command handler.
#[derive(Debug, Clone)]
pub struct CommandConfig {
    /// Stamped as `region_origin` on every local write.
    pub region: RegionId,
    /// Replication topic.
    pub topic: String,
    /// Bound on each store and publish call.
    pub io_timeout: Duration,
    /// Publish attempts after the first failure.
    pub publish_retries: u32,
    /// Delay before the first publish retry; doubles per retry.
    pub publish_retry_delay: Duration,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            region: RegionId::new("us"),
            topic: REPLICATION_TOPIC.to_string(),
            io_timeout: Duration::from_secs(2),
            publish_retries: 3,
            publish_retry_delay: Duration::from_millis(50),
        }
    }
}

impl CommandConfig {
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
    /// - `RR_IO_TIMEOUT_MS`: Store/publish call timeout (default: 2000)
    /// - `RR_PUBLISH_RETRIES`: Publish retries after a failure (default: 3)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            region: env::var("REGION")
                .map(RegionId::new)
                .unwrap_or(defaults.region),

            topic: env::var("RR_TOPIC").unwrap_or(defaults.topic),

            io_timeout: env::var("RR_IO_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.io_timeout),

            publish_retries: env::var("RR_PUBLISH_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.publish_retries),

            publish_retry_delay: defaults.publish_retry_delay,
        }
    }
}
