//! # Region Node
//!
//! Holds one region's subsystem instances and wires them together.
//!
//! ## Wiring
//!
//! ```text
//!   HTTP ──▶ Gateway ──▶ CommandHandler ──▶ RecordStore
//!                              │                 ▲
//!                              ▼                 │
//!                         Event Log ──▶ ReplicationCoordinator
//! ```
//!
//! The record store is the only state the write path and the replication
//! path share. Both reach it through `Arc<dyn RecordStore>`.

use std::path::Path;
use std::sync::Arc;

use axum::Router;
use rr_01_record_store::{InMemoryRecordStore, RecordStore};
use rr_02_idempotency_guard::IdempotencyGuard;
use rr_03_replication::{
    BusDeadLetterSink, LagReporter, ReplicationCoordinator, ReplicationLagState,
};
use rr_04_command_handler::CommandHandler;
use rr_05_api_gateway::{build_router, GatewayConfig, GatewayState};
use shared_bus::{EventPublisher, EventSubscriber};
use shared_types::{BusError, Clock, RegionId, StoreError};
use thiserror::Error;
use tracing::info;

use crate::container::config::{ConfigError, NodeConfig, RegionEndpoint};

/// Errors raised while assembling a region.
#[derive(Debug, Error)]
pub enum WiringError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to open record store for region {region}: {source}")]
    Store {
        region: RegionId,
        #[source]
        source: StoreError,
    },

    #[error("failed to set up the shared event log: {0}")]
    Log(#[from] BusError),
}

/// All subsystems of one hosted region.
pub struct RegionNode {
    region: RegionId,
    gateway_config: GatewayConfig,
    store: Arc<dyn RecordStore>,
    guard: Arc<IdempotencyGuard>,
    commands: Arc<CommandHandler>,
    coordinator: Arc<ReplicationCoordinator>,
    gateway: GatewayState,
}

impl RegionNode {
    /// Wire a region against `log`, in-process or remote.
    ///
    /// ## Initialization Order
    ///
    /// 1. Record store (in-memory, or RocksDB when a path is configured)
    /// 2. Idempotency guard
    /// 3. Replication coordinator and lag state
    /// 4. Command handler
    /// 5. Gateway state
    pub fn build<L>(
        endpoint: &RegionEndpoint,
        config: &NodeConfig,
        log: &L,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, WiringError>
    where
        L: EventPublisher + EventSubscriber + Clone + 'static,
    {
        let region = endpoint.region.clone();
        let publisher: Arc<dyn EventPublisher> = Arc::new(log.clone());
        let subscriber: Arc<dyn EventSubscriber> = Arc::new(log.clone());

        let store = open_store(config.store_path_for(&region).as_deref()).map_err(|source| {
            WiringError::Store {
                region: region.clone(),
                source,
            }
        })?;

        let guard = Arc::new(IdempotencyGuard::with_clock(
            config.idempotency.clone(),
            Arc::clone(&clock),
        ));

        let lag = Arc::new(ReplicationLagState::new());
        let replication = config.replication_for(&region);
        let dead_letters = BusDeadLetterSink::new(Arc::clone(&publisher), replication.io_timeout);
        let coordinator = Arc::new(ReplicationCoordinator::new(
            replication,
            Arc::clone(&store),
            subscriber,
            Arc::new(dead_letters),
            Arc::clone(&lag),
        ));

        let commands = Arc::new(CommandHandler::with_clock(
            config.command_for(&region),
            Arc::clone(&guard),
            Arc::clone(&store),
            publisher,
            Arc::clone(&clock),
        ));

        let gateway = GatewayState {
            region: region.clone(),
            commands: Arc::clone(&commands),
            store: Arc::clone(&store),
            lag: LagReporter::new(lag, clock),
            coordinator: coordinator.status(),
        };

        info!(
            region = %region,
            http_addr = %endpoint.http_addr,
            persistent = config.store_path.is_some(),
            "Region wired"
        );

        Ok(Self {
            region,
            gateway_config: config.gateway.with_addr(endpoint.http_addr),
            store,
            guard,
            commands,
            coordinator,
            gateway,
        })
    }

    #[must_use]
    pub fn region(&self) -> &RegionId {
        &self.region
    }

    /// Listener settings for this region.
    #[must_use]
    pub fn gateway_config(&self) -> &GatewayConfig {
        &self.gateway_config
    }

    #[must_use]
    pub fn store(&self) -> Arc<dyn RecordStore> {
        Arc::clone(&self.store)
    }

    #[must_use]
    pub fn guard(&self) -> Arc<IdempotencyGuard> {
        Arc::clone(&self.guard)
    }

    #[must_use]
    pub fn commands(&self) -> Arc<CommandHandler> {
        Arc::clone(&self.commands)
    }

    #[must_use]
    pub fn coordinator(&self) -> Arc<ReplicationCoordinator> {
        Arc::clone(&self.coordinator)
    }

    #[must_use]
    pub fn gateway_state(&self) -> GatewayState {
        self.gateway.clone()
    }

    /// HTTP router for this region, without binding a listener.
    #[must_use]
    pub fn router(&self) -> Router {
        build_router(self.gateway_state(), &self.gateway_config)
    }
}

#[cfg(feature = "rocksdb")]
fn open_store(path: Option<&Path>) -> Result<Arc<dyn RecordStore>, StoreError> {
    use rr_01_record_store::{RocksDbRecordStore, RocksDbStoreConfig};

    match path {
        Some(path) => {
            let config = RocksDbStoreConfig {
                path: path.display().to_string(),
                ..RocksDbStoreConfig::default()
            };
            Ok(Arc::new(RocksDbRecordStore::open(config)?))
        }
        None => Ok(Arc::new(InMemoryRecordStore::new())),
    }
}

#[cfg(not(feature = "rocksdb"))]
fn open_store(path: Option<&Path>) -> Result<Arc<dyn RecordStore>, StoreError> {
    match path {
        Some(path) => Err(StoreError::Unavailable(format!(
            "persistent store at {} requires the rocksdb feature",
            path.display()
        ))),
        None => Ok(Arc::new(InMemoryRecordStore::new())),
    }
}
