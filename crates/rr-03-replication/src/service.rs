//! # Replication Coordinator Service
//!
//! Runs for the life of the process. Each pass of the outer loop opens a
//! subscription, drains it until it fails, then waits out a backoff delay
//! before trying again. Only the shutdown signal ends the loop.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use region_telemetry::metric_inc;
use region_telemetry::metrics::{COORDINATOR_RECONNECTS, REPLICATION_EVENTS};
use rr_01_record_store::{RecordStore, UpsertOutcome};
use serde::Serialize;
use shared_bus::{EventSubscriber, EventSubscription, LogEntry, ReplicationEvent, SubscribeFrom};
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::ReplicationConfig;
use crate::domain::{
    ApplyOutcome, CircuitBreaker, CircuitState, CoordinatorState, ExponentialBackoff,
    ReplicationLagState,
};
use crate::error::ReplicationError;
use crate::ports::{DeadLetter, DeadLetterReason, DeadLetterSink};

const NO_OFFSET: u64 = u64::MAX;

/// Live counters and state of a coordinator.
#[derive(Debug)]
pub struct CoordinatorStatus {
    state: AtomicU8,
    applied: AtomicU64,
    duplicates: AtomicU64,
    stale: AtomicU64,
    self_origin: AtomicU64,
    poisoned: AtomicU64,
    store_failures: AtomicU64,
    reconnects: AtomicU64,
    last_offset: AtomicU64,
}

impl Default for CoordinatorStatus {
    fn default() -> Self {
        Self {
            state: AtomicU8::new(CoordinatorState::Disconnected as u8),
            applied: AtomicU64::new(0),
            duplicates: AtomicU64::new(0),
            stale: AtomicU64::new(0),
            self_origin: AtomicU64::new(0),
            poisoned: AtomicU64::new(0),
            store_failures: AtomicU64::new(0),
            reconnects: AtomicU64::new(0),
            last_offset: AtomicU64::new(NO_OFFSET),
        }
    }
}

impl CoordinatorStatus {
    #[must_use]
    pub fn state(&self) -> CoordinatorState {
        CoordinatorState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: CoordinatorState) {
        self.state.store(state as u8, Ordering::Release);
    }

    fn count(&self, outcome: ApplyOutcome) {
        let counter = match outcome {
            ApplyOutcome::Applied(_) => &self.applied,
            ApplyOutcome::Duplicate => &self.duplicates,
            ApplyOutcome::Stale => &self.stale,
            ApplyOutcome::SelfOrigin => &self.self_origin,
            ApplyOutcome::Poisoned => &self.poisoned,
            ApplyOutcome::StoreFailure => &self.store_failures,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Offset of the next entry to read when resuming.
    fn next_offset(&self) -> Option<u64> {
        match self.last_offset.load(Ordering::Acquire) {
            NO_OFFSET => None,
            offset => Some(offset + 1),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> StatusSnapshot {
        let last_offset = match self.last_offset.load(Ordering::Acquire) {
            NO_OFFSET => None,
            offset => Some(offset),
        };
        StatusSnapshot {
            state: self.state(),
            applied: self.applied.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            stale: self.stale.load(Ordering::Relaxed),
            self_origin: self.self_origin.load(Ordering::Relaxed),
            poisoned: self.poisoned.load(Ordering::Relaxed),
            store_failures: self.store_failures.load(Ordering::Relaxed),
            reconnects: self.reconnects.load(Ordering::Relaxed),
            last_offset,
        }
    }
}

/// Point-in-time copy of [`CoordinatorStatus`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub state: CoordinatorState,
    pub applied: u64,
    pub duplicates: u64,
    pub stale: u64,
    pub self_origin: u64,
    pub poisoned: u64,
    pub store_failures: u64,
    pub reconnects: u64,
    pub last_offset: Option<u64>,
}

/// How one subscription ended.
enum ConsumeEnd {
    Shutdown,
    Failed {
        error: ReplicationError,
        /// At least one entry arrived before the failure.
        delivered: bool,
    },
}

/// Consumer-side replication state machine for one region.
pub struct ReplicationCoordinator {
    config: ReplicationConfig,
    store: Arc<dyn RecordStore>,
    subscriber: Arc<dyn EventSubscriber>,
    dead_letters: Arc<dyn DeadLetterSink>,
    lag: Arc<ReplicationLagState>,
    status: Arc<CoordinatorStatus>,
    breaker: CircuitBreaker,
}

impl ReplicationCoordinator {
    pub fn new(
        config: ReplicationConfig,
        store: Arc<dyn RecordStore>,
        subscriber: Arc<dyn EventSubscriber>,
        dead_letters: Arc<dyn DeadLetterSink>,
        lag: Arc<ReplicationLagState>,
    ) -> Self {
        let breaker = CircuitBreaker::new(
            format!("replication-{}", config.region),
            config.breaker.clone(),
        );
        Self {
            config,
            store,
            subscriber,
            dead_letters,
            lag,
            status: Arc::new(CoordinatorStatus::default()),
            breaker,
        }
    }

    /// Shared handle on the live status.
    #[must_use]
    pub fn status(&self) -> Arc<CoordinatorStatus> {
        Arc::clone(&self.status)
    }

    /// Lag state this coordinator writes.
    #[must_use]
    pub fn lag_state(&self) -> Arc<ReplicationLagState> {
        Arc::clone(&self.lag)
    }

    #[must_use]
    pub fn config(&self) -> &ReplicationConfig {
        &self.config
    }

    fn region(&self) -> &str {
        self.config.region.as_str()
    }

    fn transition(&self, to: CoordinatorState) {
        let from = self.status.state();
        if from != to {
            debug!(region = self.region(), from = %from, to = %to, "Coordinator state change");
            self.status.set_state(to);
        }
    }

    /// Run until `shutdown` turns `true` or its sender is dropped.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(region = self.region(), topic = %self.config.topic, "Replication coordinator starting");
        let mut backoff = ExponentialBackoff::new(&self.config.backoff);

        loop {
            if *shutdown.borrow() {
                break;
            }

            self.transition(CoordinatorState::Connecting);

            if !self.breaker.should_allow() {
                let pause = self
                    .breaker
                    .remaining_open()
                    .unwrap_or(self.config.breaker.open_timeout);
                if wait_or_shutdown(pause, &mut shutdown).await {
                    break;
                }
                continue;
            }

            match self.connect().await {
                Ok(subscription) => {
                    self.transition(CoordinatorState::Subscribed);
                    let opened = Instant::now();

                    match self.consume(subscription, &mut shutdown, &mut backoff).await {
                        ConsumeEnd::Shutdown => break,
                        ConsumeEnd::Failed { error, delivered } => {
                            // A subscription that dies before delivering
                            // anything counts as a failed connect unless it
                            // stayed up for a full backoff period.
                            if !delivered {
                                if opened.elapsed() >= self.config.backoff.max {
                                    self.mark_healthy(&mut backoff);
                                } else {
                                    self.breaker.record_failure();
                                }
                            }
                            warn!(region = self.region(), error = %error, "Replication subscription lost, reconnecting");
                        }
                    }
                }
                Err(e) => {
                    self.breaker.record_failure();
                    if self.breaker.state() == CircuitState::Closed {
                        warn!(
                            region = self.region(),
                            error = %e,
                            attempt = backoff.attempt() + 1,
                            "Replication connect failed"
                        );
                    } else {
                        debug!(region = self.region(), error = %e, "Replication connect failed");
                    }
                }
            }

            self.status.reconnects.fetch_add(1, Ordering::Relaxed);
            metric_inc!(COORDINATOR_RECONNECTS, &[self.region()]);

            let delay = backoff.next_delay();
            if wait_or_shutdown(delay, &mut shutdown).await {
                break;
            }
        }

        self.transition(CoordinatorState::Stopped);
        info!(region = self.region(), "Replication coordinator stopped");
    }

    async fn connect(&self) -> Result<Box<dyn EventSubscription>, ReplicationError> {
        let from = match self.status.next_offset() {
            Some(offset) if self.config.resume_from_checkpoint => SubscribeFrom::Offset(offset),
            _ => SubscribeFrom::Earliest,
        };

        let subscription = timeout(
            self.config.connect_timeout,
            self.subscriber.subscribe(&self.config.topic, from),
        )
        .await
        .map_err(|_| ReplicationError::ConnectTimeout {
            timeout_ms: self.config.connect_timeout.as_millis() as u64,
        })?
        .map_err(ReplicationError::Subscribe)?;

        info!(region = self.region(), from = ?from, "Subscribed to replication topic");
        Ok(subscription)
    }

    fn mark_healthy(&self, backoff: &mut ExponentialBackoff) {
        self.breaker.record_success();
        backoff.reset();
    }

    async fn consume(
        &self,
        mut subscription: Box<dyn EventSubscription>,
        shutdown: &mut watch::Receiver<bool>,
        backoff: &mut ExponentialBackoff,
    ) -> ConsumeEnd {
        self.transition(CoordinatorState::Running);
        let mut delivered = false;

        loop {
            let next = tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        return ConsumeEnd::Shutdown;
                    }
                    continue;
                }
                next = subscription.next() => next,
            };

            match next {
                Ok(Some(entry)) => {
                    if !delivered {
                        delivered = true;
                        self.mark_healthy(backoff);
                    }
                    self.apply_entry(&entry).await;
                }
                Ok(None) => {
                    return ConsumeEnd::Failed {
                        error: ReplicationError::EndOfStream,
                        delivered,
                    }
                }
                Err(e) => {
                    return ConsumeEnd::Failed {
                        error: ReplicationError::Transport(e),
                        delivered,
                    }
                }
            }
        }
    }

    /// Apply one inbound entry.
    ///
    /// Never fails: every problem is reported through the outcome, the
    /// metrics and the dead-letter sink.
    pub async fn apply_entry(&self, entry: &LogEntry) -> ApplyOutcome {
        let outcome = self.apply_inner(entry).await;

        self.status.count(outcome);
        self.status.last_offset.store(entry.offset, Ordering::Release);
        metric_inc!(REPLICATION_EVENTS, &[self.region(), outcome.label()]);

        outcome
    }

    async fn apply_inner(&self, entry: &LogEntry) -> ApplyOutcome {
        let event = match ReplicationEvent::decode(&entry.key, &entry.payload) {
            Ok(event) => event,
            Err(e) => {
                self.dead_letter(entry, DeadLetterReason::Poisoned(e.to_string()))
                    .await;
                return ApplyOutcome::Poisoned;
            }
        };

        if event.origin() == &self.config.region {
            return ApplyOutcome::SelfOrigin;
        }

        let record = &event.record;
        let result = timeout(
            self.config.io_timeout,
            self.store.upsert_if_newer_version(record),
        )
        .await;

        let outcome = match result {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                self.dead_letter(entry, DeadLetterReason::StoreFailure(e.to_string()))
                    .await;
                return ApplyOutcome::StoreFailure;
            }
            Err(_) => {
                let reason = format!(
                    "upsert timed out after {}ms",
                    self.config.io_timeout.as_millis()
                );
                self.dead_letter(entry, DeadLetterReason::StoreFailure(reason))
                    .await;
                return ApplyOutcome::StoreFailure;
            }
        };

        match outcome {
            UpsertOutcome::Unchanged => {
                debug!(
                    region = self.region(),
                    entity_id = %record.id,
                    version = record.version,
                    offset = entry.offset,
                    "Replayed event already applied"
                );
                ApplyOutcome::Duplicate
            }
            UpsertOutcome::Stale => {
                debug!(
                    region = self.region(),
                    entity_id = %record.id,
                    version = record.version,
                    "Ignoring stale replication event"
                );
                ApplyOutcome::Stale
            }
            applied => {
                self.lag.record(record.updated_at);
                debug!(
                    region = self.region(),
                    entity_id = %record.id,
                    version = record.version,
                    origin = %record.region_origin,
                    offset = entry.offset,
                    "Applied replication event"
                );
                ApplyOutcome::Applied(applied)
            }
        }
    }

    async fn dead_letter(&self, entry: &LogEntry, reason: DeadLetterReason) {
        self.dead_letters
            .send(DeadLetter {
                entry: entry.clone(),
                reason,
            })
            .await;
    }
}

/// Sleep for `delay` unless shutdown is signalled first.
///
/// Returns `true` when the caller should stop.
async fn wait_or_shutdown(delay: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(delay) => *shutdown.borrow(),
        changed = shutdown.changed() => changed.is_err() || *shutdown.borrow(),
    }
}
