//! The node runtime orchestrating every hosted region.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rr_05_api_gateway::ApiGatewayService;
use shared_bus::{serve_log, InMemoryEventLog, RemoteEventLog, RemoteLogConfig};
use shared_types::{Clock, SystemClock};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::container::{NodeConfig, RegionNode, WiringError};
use crate::wiring::supervisor::{supervise_coordinator, RESTART_DELAY};

/// How long shutdown waits for tasks to drain.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// The replication log hosted regions publish to and consume from.
pub enum LogBackend {
    /// Held by this process; optionally served to peers.
    Local(InMemoryEventLog),
    /// Hosted by a peer node.
    Remote(RemoteEventLog),
}

/// The main node runtime.
pub struct NodeRuntime {
    config: NodeConfig,
    /// Shared by every hosted region.
    log: LogBackend,
    regions: Vec<RegionNode>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    /// Shutdown signal sender.
    shutdown_tx: watch::Sender<bool>,
    /// Shutdown signal receiver.
    shutdown_rx: watch::Receiver<bool>,
}

impl NodeRuntime {
    /// Create a runtime with the system clock.
    pub fn new(config: NodeConfig) -> Result<Self, WiringError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a runtime, wiring every configured region.
    pub fn with_clock(config: NodeConfig, clock: Arc<dyn Clock>) -> Result<Self, WiringError> {
        config.validate()?;

        let log = match &config.log.url {
            Some(url) => LogBackend::Remote(RemoteEventLog::new(RemoteLogConfig::new(url.clone()))?),
            None => LogBackend::Local(InMemoryEventLog::with_partitions(config.partitions)),
        };
        let regions = config
            .regions
            .iter()
            .map(|endpoint| match &log {
                LogBackend::Local(local) => {
                    RegionNode::build(endpoint, &config, local, Arc::clone(&clock))
                }
                LogBackend::Remote(remote) => {
                    RegionNode::build(endpoint, &config, remote, Arc::clone(&clock))
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Ok(Self {
            config,
            log,
            regions,
            tasks: Mutex::new(Vec::new()),
            shutdown_tx,
            shutdown_rx,
        })
    }

    /// Start the runtime.
    ///
    /// ## Startup Sequence
    ///
    /// 1. Serve the log to peers when `RR_LOG_LISTEN` is set
    /// 2. For each region, spawn the supervised replication coordinator
    ///    and the HTTP server
    ///
    /// Neither waits on the other, so HTTP is reachable while replication
    /// is still connecting.
    pub fn start(&self) {
        info!("===========================================");
        info!("  Region Replicator Node v{}", env!("CARGO_PKG_VERSION"));
        info!(
            "  Mode: {}",
            if self.config.is_local_cluster() {
                "local cluster"
            } else {
                "single region"
            }
        );
        info!("===========================================");

        if !self.config.has_shared_log() {
            warn!(
                "No shared event log: writes stay in this process and no peer \
                 replicates them. Set RR_LOG_LISTEN to host the log or RR_LOG_URL to join one."
            );
        }

        let mut tasks = self.tasks.lock();

        match (&self.log, self.config.log.listen) {
            (LogBackend::Local(log), Some(addr)) => {
                let log = log.clone();
                let shutdown = self.shutdown_rx.clone();
                tasks.push(tokio::spawn(async move {
                    let served = match TcpListener::bind(addr).await {
                        Ok(listener) => serve_log(listener, log, shutdown).await,
                        Err(e) => Err(e),
                    };
                    if let Err(e) = served {
                        error!(addr = %addr, error = %e, "Event log server failed");
                    }
                }));
            }
            (LogBackend::Remote(remote), _) => {
                info!(url = %remote.config().url, "Joining event log hosted by a peer");
            }
            (LogBackend::Local(_), None) => {}
        }

        for node in &self.regions {
            let coordinator = node.coordinator();
            let shutdown = self.shutdown_rx.clone();
            tasks.push(tokio::spawn(async move {
                supervise_coordinator(coordinator, shutdown, RESTART_DELAY).await;
            }));

            let server = ApiGatewayService::new(node.gateway_config().clone(), node.gateway_state());
            let shutdown = self.shutdown_rx.clone();
            let region = node.region().clone();
            tasks.push(tokio::spawn(async move {
                if let Err(e) = server.serve(shutdown).await {
                    error!(region = %region, error = %e, "HTTP server failed");
                }
            }));

            info!(
                region = %node.region(),
                http_addr = %node.gateway_config().http_addr,
                "Region started"
            );
        }
    }

    /// Shutdown the node gracefully.
    ///
    /// ## Shutdown Sequence
    ///
    /// 1. Signal shutdown to every task
    /// 2. Close an in-process log so open subscriptions end
    /// 3. Wait for tasks to drain, bounded by a grace period
    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown...");

        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }
        if let LogBackend::Local(log) = &self.log {
            log.shutdown();
        }

        let tasks: Vec<_> = self.tasks.lock().drain(..).collect();
        for task in tasks {
            match tokio::time::timeout(SHUTDOWN_GRACE, task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(error = %e, "Task ended abnormally during shutdown"),
                Err(_) => warn!("Task did not stop within the shutdown grace period"),
            }
        }

        info!("Shutdown complete");
    }

    /// Hosted regions.
    #[must_use]
    pub fn regions(&self) -> &[RegionNode] {
        &self.regions
    }

    /// The hosted region named `region`, if any.
    #[must_use]
    pub fn region(&self, region: &str) -> Option<&RegionNode> {
        self.regions.iter().find(|node| node.region().as_str() == region)
    }

    /// The log shared by hosted regions.
    #[must_use]
    pub fn log(&self) -> &LogBackend {
        &self.log
    }

    /// The log, when this process holds it.
    #[must_use]
    pub fn local_log(&self) -> Option<&InMemoryEventLog> {
        match &self.log {
            LogBackend::Local(log) => Some(log),
            LogBackend::Remote(_) => None,
        }
    }

    #[must_use]
    pub fn config(&self) -> &NodeConfig {
        &self.config
    }
}
