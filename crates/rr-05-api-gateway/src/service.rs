//! API Gateway service.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use region_telemetry::metrics::REPLICATION_LAG;
use rr_01_record_store::RecordStore;
use rr_03_replication::{CoordinatorStatus, LagReporter};
use rr_04_command_handler::{CommandHandler, UpdateCommand};
use shared_types::{EntityId, RegionId};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{error, info};

use crate::config::GatewayConfig;
use crate::domain::{ApiError, UpdateBody, REQUEST_ID_HEADER};

/// Application state shared across handlers
#[derive(Clone)]
pub struct GatewayState {
    pub region: RegionId,
    pub commands: Arc<CommandHandler>,
    pub store: Arc<dyn RecordStore>,
    pub lag: LagReporter,
    pub coordinator: Arc<CoordinatorStatus>,
}

/// Build the HTTP router for one region.
pub fn build_router(state: GatewayState, config: &GatewayConfig) -> Router {
    let middleware = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(config.request_timeout));

    Router::new()
        .route("/entities/:id", get(get_entity).put(put_entity))
        .route("/properties/:id", get(get_entity).put(put_entity))
        .route("/replication-lag", get(replication_lag))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .layer(middleware)
        .with_state(state)
}

/// HTTP server for one region.
pub struct ApiGatewayService {
    config: GatewayConfig,
    state: GatewayState,
}

impl ApiGatewayService {
    pub fn new(config: GatewayConfig, state: GatewayState) -> Self {
        Self { config, state }
    }

    /// Bind and serve until `shutdown` turns `true`.
    pub async fn serve(&self, mut shutdown: watch::Receiver<bool>) -> std::io::Result<()> {
        let listener = TcpListener::bind(self.config.http_addr).await?;
        info!(
            region = %self.state.region,
            addr = %self.config.http_addr,
            "HTTP server listening"
        );

        let router = build_router(self.state.clone(), &self.config);
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                while !*shutdown.borrow_and_update() {
                    if shutdown.changed().await.is_err() {
                        break;
                    }
                }
            })
            .await?;

        info!(region = %self.state.region, "HTTP server stopped");
        Ok(())
    }
}

fn parse_id(raw: &str) -> Result<EntityId, ApiError> {
    raw.parse().map_err(|_| ApiError::InvalidId(raw.to_string()))
}

/// `PUT /entities/{id}`
async fn put_entity(
    State(state): State<GatewayState>,
    Path(raw_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let request_id = headers
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    // The missing header is reported before anything else about the request.
    if request_id.as_deref().map_or(true, |id| id.trim().is_empty()) {
        return Err(rr_04_command_handler::CommandError::MissingRequestId.into());
    }

    let id = parse_id(&raw_id)?;
    let body: UpdateBody =
        serde_json::from_slice(&body).map_err(|e| ApiError::InvalidBody(e.to_string()))?;

    let command = UpdateCommand {
        id,
        request_id,
        update: body.attributes(),
        expected_version: body.version,
    };

    let record = state.commands.handle(command).await?;
    Ok(Json(record))
}

/// `GET /entities/{id}`
async fn get_entity(
    State(state): State<GatewayState>,
    Path(raw_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&raw_id)?;
    match state.store.get_by_id(id).await? {
        Some(record) => Ok(Json(record)),
        None => Err(ApiError::NotFound(id)),
    }
}

/// `GET /replication-lag`
async fn replication_lag(State(state): State<GatewayState>) -> impl IntoResponse {
    let report = state.lag.report();
    REPLICATION_LAG
        .with_label_values(&[state.region.as_str()])
        .set(report.lag_seconds);
    Json(report)
}

/// Health check endpoint
///
/// Liveness only: replication being down does not make the node unhealthy.
async fn health_check(State(state): State<GatewayState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "region": state.region.as_str(),
        "replication": state.coordinator.snapshot(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Prometheus text exposition
async fn metrics(State(state): State<GatewayState>) -> impl IntoResponse {
    REPLICATION_LAG
        .with_label_values(&[state.region.as_str()])
        .set(state.lag.current_lag_seconds());

    match region_telemetry::encode_metrics() {
        Ok(text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
