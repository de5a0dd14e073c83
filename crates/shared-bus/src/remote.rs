//! # Remote Event Log
//!
//! Shares one node's [`InMemoryEventLog`] with region nodes running in
//! other processes.
//!
//! ```text
//! ┌──────────────────┐   POST /log/{topic}          ┌──────────────────┐
//! │  node "us"       │ ◀──────────────────────────  │  node "eu"       │
//! │  InMemoryEventLog│   GET  /log/{topic}?from=N   │  RemoteEventLog  │
//! │  + log_router    │ ◀──────────────────────────  │                  │
//! └──────────────────┘        (long poll)           └──────────────────┘
//! ```
//!
//! The hosting node keeps the only copy of the log, so ordering, offsets
//! and replay behave exactly as they do in-process. Reads long-poll: the
//! host holds an empty read open for up to `wait_ms` until an entry lands.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared_types::BusError;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::publisher::{EventPublisher, InMemoryEventLog, PublishAck};
use crate::subscriber::{EventSubscriber, EventSubscription, LogEntry, SubscribeFrom};

/// Largest batch one read returns.
const MAX_BATCH: usize = 1_000;

/// Longest a single read is held open.
const MAX_WAIT_MS: u64 = 30_000;

#[derive(Debug, Serialize, Deserialize)]
struct PublishBody {
    key: String,
    payload: Vec<u8>,
}

#[derive(Debug, Deserialize)]
struct ReadParams {
    from: u64,
    #[serde(default = "default_limit")]
    limit: usize,
    #[serde(default)]
    wait_ms: u64,
}

fn default_limit() -> usize {
    256
}

// =============================================================================
// HOST SIDE
// =============================================================================

struct LogApiError(BusError);

impl From<BusError> for LogApiError {
    fn from(error: BusError) -> Self {
        Self(error)
    }
}

impl IntoResponse for LogApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            BusError::Closed => StatusCode::GONE,
            BusError::Encoding(_) => StatusCode::BAD_REQUEST,
            BusError::Unavailable(_) | BusError::Timeout { .. } => StatusCode::SERVICE_UNAVAILABLE,
        };
        (status, self.0.to_string()).into_response()
    }
}

/// Routes exposing `log` to remote nodes.
pub fn log_router(log: InMemoryEventLog) -> Router {
    Router::new()
        .route("/log/:topic", post(append_entry).get(read_entries))
        .with_state(log)
}

/// Serve `log` on `listener` until `shutdown` turns `true`.
pub async fn serve_log(
    listener: TcpListener,
    log: InMemoryEventLog,
    mut shutdown: watch::Receiver<bool>,
) -> std::io::Result<()> {
    info!(addr = %listener.local_addr()?, "Event log listening");

    axum::serve(listener, log_router(log))
        .with_graceful_shutdown(async move {
            while !*shutdown.borrow_and_update() {
                if shutdown.changed().await.is_err() {
                    break;
                }
            }
        })
        .await?;

    info!("Event log server stopped");
    Ok(())
}

/// `POST /log/{topic}`
async fn append_entry(
    State(log): State<InMemoryEventLog>,
    Path(topic): Path<String>,
    Json(body): Json<PublishBody>,
) -> Result<Json<PublishAck>, LogApiError> {
    let ack = log.publish(&topic, &body.key, body.payload).await?;
    Ok(Json(ack))
}

/// `GET /log/{topic}?from=N&limit=M&wait_ms=W`
async fn read_entries(
    State(log): State<InMemoryEventLog>,
    Path(topic): Path<String>,
    Query(params): Query<ReadParams>,
) -> Result<Json<Vec<LogEntry>>, LogApiError> {
    let limit = params.limit.clamp(1, MAX_BATCH);
    let mut entries = log.read(&topic, params.from, limit)?;

    if entries.is_empty() && params.wait_ms > 0 {
        let wait = Duration::from_millis(params.wait_ms.min(MAX_WAIT_MS));
        let mut subscription = log
            .subscribe(&topic, SubscribeFrom::Offset(params.from))
            .await?;

        match tokio::time::timeout(wait, subscription.next()).await {
            Ok(Ok(Some(first))) => {
                entries.push(first);
                entries.extend(log.read(&topic, params.from + 1, limit - 1)?);
            }
            Ok(Ok(None)) => return Err(BusError::Closed.into()),
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => {}
        }
    }

    Ok(Json(entries))
}

// =============================================================================
// CLIENT SIDE
// =============================================================================

/// Where the shared log is served and how to talk to it.
#[derive(Debug, Clone)]
pub struct RemoteLogConfig {
    /// Base URL of the hosting node, e.g. `http://10.0.0.5:9000`.
    pub url: String,
    /// Bound on a publish, and on a read beyond its long-poll wait.
    pub request_timeout: Duration,
    /// How long the host may hold an empty read open.
    pub poll_wait: Duration,
    /// Entries fetched per read.
    pub batch_size: usize,
}

impl RemoteLogConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            request_timeout: Duration::from_secs(5),
            poll_wait: Duration::from_secs(1),
            batch_size: default_limit(),
        }
    }
}

/// Publisher and subscriber over a log hosted by another node.
#[derive(Clone)]
pub struct RemoteEventLog {
    client: Client,
    config: Arc<RemoteLogConfig>,
}

impl RemoteEventLog {
    pub fn new(config: RemoteLogConfig) -> Result<Self, BusError> {
        let client = Client::builder()
            .connect_timeout(config.request_timeout)
            .build()
            .map_err(|e| BusError::Unavailable(format!("HTTP client setup failed: {}", e)))?;

        Ok(Self {
            client,
            config: Arc::new(config),
        })
    }

    #[must_use]
    pub fn config(&self) -> &RemoteLogConfig {
        &self.config
    }

    fn topic_url(&self, topic: &str) -> String {
        format!("{}/log/{}", self.config.url.trim_end_matches('/'), topic)
    }

    async fn fetch(&self, topic: &str, from: u64, wait: Duration) -> Result<Vec<LogEntry>, BusError> {
        let wait_ms = wait.as_millis() as u64;
        let response = self
            .client
            .get(self.topic_url(topic))
            .query(&[
                ("from", from),
                ("limit", self.config.batch_size as u64),
                ("wait_ms", wait_ms),
            ])
            .timeout(self.config.request_timeout + wait)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| BusError::Unavailable(format!("Malformed log response: {}", e)))
    }

    fn transport_error(&self, error: reqwest::Error) -> BusError {
        if error.is_connect() {
            BusError::Unavailable(format!("Cannot connect to {}", self.config.url))
        } else {
            BusError::Unavailable(error.to_string())
        }
    }
}

/// Map a non-success answer from the host back onto the bus error it encodes.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, BusError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let detail = response.text().await.unwrap_or_default();
    Err(match status {
        reqwest::StatusCode::GONE => BusError::Closed,
        reqwest::StatusCode::BAD_REQUEST => BusError::Encoding(detail),
        _ => BusError::Unavailable(format!("Log host answered {}: {}", status, detail)),
    })
}

#[async_trait]
impl EventPublisher for RemoteEventLog {
    async fn publish(
        &self,
        topic: &str,
        key: &str,
        payload: Vec<u8>,
    ) -> Result<PublishAck, BusError> {
        let body = PublishBody {
            key: key.to_string(),
            payload,
        };
        let response = self
            .client
            .post(self.topic_url(topic))
            .json(&body)
            .timeout(self.config.request_timeout)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let ack: PublishAck = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| BusError::Unavailable(format!("Malformed publish ack: {}", e)))?;

        debug!(topic, key, partition = ack.partition, offset = ack.offset, "Event published remotely");
        Ok(ack)
    }
}

#[async_trait]
impl EventSubscriber for RemoteEventLog {
    async fn subscribe(
        &self,
        topic: &str,
        from: SubscribeFrom,
    ) -> Result<Box<dyn EventSubscription>, BusError> {
        let start = match from {
            SubscribeFrom::Earliest => 0,
            SubscribeFrom::Offset(offset) => offset,
        };

        // The first read doubles as a reachability check.
        let buffered: VecDeque<LogEntry> = self.fetch(topic, start, Duration::ZERO).await?.into();

        debug!(topic, start, url = %self.config.url, "Remote subscription created");
        Ok(Box::new(RemoteSubscription {
            log: self.clone(),
            topic: topic.to_string(),
            next_offset: start,
            buffered,
        }))
    }
}

/// Subscription over a [`RemoteEventLog`].
pub struct RemoteSubscription {
    log: RemoteEventLog,
    topic: String,
    next_offset: u64,
    buffered: VecDeque<LogEntry>,
}

#[async_trait]
impl EventSubscription for RemoteSubscription {
    async fn next(&mut self) -> Result<Option<LogEntry>, BusError> {
        loop {
            if let Some(entry) = self.buffered.pop_front() {
                self.next_offset = entry.offset + 1;
                return Ok(Some(entry));
            }

            let wait = self.log.config.poll_wait;
            match self.log.fetch(&self.topic, self.next_offset, wait).await {
                Ok(entries) => self.buffered.extend(entries),
                Err(BusError::Closed) => return Ok(None),
                Err(e) => return Err(e),
            }
        }
    }
}
