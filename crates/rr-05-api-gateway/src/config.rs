//! Gateway configuration from environment variables.

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

/// HTTP listener configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub http_addr: SocketAddr,
    /// Bound on a whole request.
    pub request_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            http_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl GatewayConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `RR_HTTP_ADDR`: Listen address (default: 0.0.0.0:3000)
    /// - `RR_REQUEST_TIMEOUT_MS`: Request timeout (default: 10000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            http_addr: env::var("RR_HTTP_ADDR")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.http_addr),

            request_timeout: env::var("RR_REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.request_timeout),
        }
    }

    /// Same settings on another address.
    #[must_use]
    pub fn with_addr(&self, http_addr: SocketAddr) -> Self {
        Self {
            http_addr,
            ..self.clone()
        }
    }
}
