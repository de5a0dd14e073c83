//! # Two-Region Cluster Fixture
//!
//! Builds `us` and `eu` with the production wiring, runs both coordinators
//! under supervision and exposes each region's router for in-process HTTP.

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::{TimeZone, Utc};
use node_runtime::{parse_regions, supervise_coordinator, NodeConfig, RegionNode};
use rr_03_replication::{BackoffConfig, StatusSnapshot};
use rr_05_api_gateway::REQUEST_ID_HEADER;
use serde_json::Value;
use shared_bus::InMemoryEventLog;
use shared_types::{EntityId, EntityRecord, ManualClock};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tower::ServiceExt;

/// Upper bound on waiting for asynchronous replication.
pub const CONVERGENCE_TIMEOUT: Duration = Duration::from_secs(3);

const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Configuration with fast reconnects and a single publish retry.
pub fn test_config() -> NodeConfig {
    let mut config = NodeConfig {
        regions: parse_regions("us=127.0.0.1:3100,eu=127.0.0.1:3101")
            .expect("valid region list"),
        ..NodeConfig::default()
    };
    config.replication.backoff = BackoffConfig {
        base: Duration::from_millis(5),
        max: Duration::from_millis(20),
    };
    config.replication.breaker.failure_threshold = 1_000;
    config.command.publish_retries = 1;
    config.command.publish_retry_delay = Duration::from_millis(1);
    config
}

/// Two running regions on one shared log.
pub struct Cluster {
    pub log: InMemoryEventLog,
    pub clock: Arc<ManualClock>,
    pub us: RegionNode,
    pub eu: RegionNode,
    shutdown: watch::Sender<bool>,
    supervisors: Vec<JoinHandle<u32>>,
}

impl Cluster {
    pub fn start() -> Self {
        Self::start_with(test_config())
    }

    pub fn start_with(config: NodeConfig) -> Self {
        let log = InMemoryEventLog::with_partitions(config.partitions);
        let clock = Arc::new(ManualClock::new(
            Utc.timestamp_opt(1_700_000_000, 0).single().expect("valid timestamp"),
        ));

        let mut nodes = config
            .regions
            .iter()
            .map(|endpoint| {
                RegionNode::build(endpoint, &config, &log, clock.clone()).expect("region wires")
            })
            .collect::<Vec<_>>();
        let eu = nodes.pop().expect("eu region");
        let us = nodes.pop().expect("us region");

        let (shutdown, rx) = watch::channel(false);
        let supervisors = [&us, &eu]
            .into_iter()
            .map(|node| {
                tokio::spawn(supervise_coordinator(
                    node.coordinator(),
                    rx.clone(),
                    Duration::from_millis(10),
                ))
            })
            .collect();

        Self {
            log,
            clock,
            us,
            eu,
            shutdown,
            supervisors,
        }
    }

    pub fn node(&self, region: &str) -> &RegionNode {
        match region {
            "us" => &self.us,
            "eu" => &self.eu,
            other => panic!("unknown region {other}"),
        }
    }

    pub fn router(&self, region: &str) -> Router {
        self.node(region).router()
    }

    pub fn status(&self, region: &str) -> StatusSnapshot {
        self.node(region).coordinator().status().snapshot()
    }

    /// Stop both coordinators and wait for them.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        for supervisor in self.supervisors {
            let _ = tokio::time::timeout(Duration::from_secs(2), supervisor).await;
        }
    }

    /// Poll `region`'s store until `id` reaches `version`.
    pub async fn wait_for_version(
        &self,
        region: &str,
        id: u64,
        version: u64,
    ) -> Option<EntityRecord> {
        let store = self.node(region).store();
        let deadline = tokio::time::Instant::now() + CONVERGENCE_TIMEOUT;
        loop {
            if let Ok(Some(record)) = store.get_by_id(EntityId(id)).await {
                if record.version >= version {
                    return Some(record);
                }
            }
            if tokio::time::Instant::now() >= deadline {
                return None;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Poll `region`'s coordinator status until `predicate` holds.
    pub async fn wait_for_status(
        &self,
        region: &str,
        predicate: impl Fn(&StatusSnapshot) -> bool,
    ) -> bool {
        let deadline = tokio::time::Instant::now() + CONVERGENCE_TIMEOUT;
        loop {
            if predicate(&self.status(region)) {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

// =============================================================================
// HTTP HELPERS
// =============================================================================

pub fn put_request(id: u64, request_id: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::PUT)
        .uri(format!("/entities/{id}"))
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(request_id) = request_id {
        builder = builder.header(REQUEST_ID_HEADER, request_id);
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("valid request")
}

pub fn get_request(path: &str) -> Request<Body> {
    Request::builder()
        .uri(path)
        .body(Body::empty())
        .expect("valid request")
}

pub async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.expect("infallible router");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("readable body");
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

/// `PUT /entities/{id}` with a price and expected version.
pub async fn put(
    cluster: &Cluster,
    region: &str,
    id: u64,
    request_id: &str,
    price: f64,
    version: u64,
) -> (StatusCode, Value) {
    send(
        cluster.router(region),
        put_request(
            id,
            Some(request_id),
            serde_json::json!({ "price": price, "version": version }),
        ),
    )
    .await
}

pub async fn get(cluster: &Cluster, region: &str, path: &str) -> (StatusCode, Value) {
    send(cluster.router(region), get_request(path)).await
}
