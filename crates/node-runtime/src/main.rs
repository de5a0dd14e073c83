//! # Region Replicator Node
//!
//! Entry point for a region node.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration from the environment
//! 2. Initialize logging and metrics
//! 3. Wire every hosted region
//! 4. Start coordinators and HTTP listeners
//! 5. Wait for Ctrl+C, then shut down gracefully

use anyhow::{Context, Result};
use node_runtime::{NodeConfig, NodeRuntime};
use region_telemetry::init_telemetry;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = NodeConfig::from_env().context("Invalid configuration")?;
    init_telemetry(&config.telemetry).context("Failed to initialize telemetry")?;

    let runtime = NodeRuntime::new(config).context("Failed to wire regions")?;
    runtime.start();

    info!("Node is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;

    runtime.shutdown().await;

    Ok(())
}
