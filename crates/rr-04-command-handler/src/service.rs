//! # Command Handler Service

use std::sync::Arc;
use std::time::{Duration, Instant};

use region_telemetry::metric_inc;
use region_telemetry::metrics::{COMMANDS, COMMAND_DURATION, IDEMPOTENCY_MARKERS};
use rr_01_record_store::RecordStore;
use rr_02_idempotency_guard::{IdempotencyGuard, Reservation};
use shared_bus::{EventPublisher, ReplicationEvent};
use shared_types::{BusError, Clock, EntityRecord, SystemClock};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::config::CommandConfig;
use crate::domain::UpdateCommand;
use crate::error::CommandError;

/// Accepts local writes for one region.
pub struct CommandHandler {
    config: CommandConfig,
    guard: Arc<IdempotencyGuard>,
    store: Arc<dyn RecordStore>,
    publisher: Arc<dyn EventPublisher>,
    clock: Arc<dyn Clock>,
}

impl CommandHandler {
    pub fn new(
        config: CommandConfig,
        guard: Arc<IdempotencyGuard>,
        store: Arc<dyn RecordStore>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self::with_clock(config, guard, store, publisher, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: CommandConfig,
        guard: Arc<IdempotencyGuard>,
        store: Arc<dyn RecordStore>,
        publisher: Arc<dyn EventPublisher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            guard,
            store,
            publisher,
            clock,
        }
    }

    #[must_use]
    pub fn config(&self) -> &CommandConfig {
        &self.config
    }

    fn region(&self) -> &str {
        self.config.region.as_str()
    }

    /// Handle one update command.
    ///
    /// # Returns
    ///
    /// The committed record, published for the other region to apply.
    ///
    /// # Errors
    ///
    /// - `MissingRequestId`, `Duplicate`, `VersionConflict`, `Store`,
    ///   `Timeout` - Nothing was committed
    /// - `ReplicationPending` - Committed locally, publish failed after retries
    pub async fn handle(&self, command: UpdateCommand) -> Result<EntityRecord, CommandError> {
        let started = Instant::now();
        let result = self.handle_inner(&command).await;

        let outcome = match &result {
            Ok(_) => "committed",
            Err(e) => e.label(),
        };
        metric_inc!(COMMANDS, &[self.region(), outcome]);
        COMMAND_DURATION
            .with_label_values(&[self.region()])
            .observe(started.elapsed().as_secs_f64());
        IDEMPOTENCY_MARKERS
            .with_label_values(&[self.region()])
            .set(self.guard.len() as f64);

        result
    }

    async fn handle_inner(&self, command: &UpdateCommand) -> Result<EntityRecord, CommandError> {
        let request_id = command.validated_request_id()?;

        match self.guard.try_reserve(request_id) {
            Reservation::Acquired => {}
            Reservation::Committed | Reservation::InFlight => {
                debug!(region = self.region(), request_id, "Duplicate request rejected");
                return Err(CommandError::Duplicate {
                    request_id: request_id.to_string(),
                });
            }
        }

        let record = match self.write(command).await {
            Ok(record) => record,
            Err(e) => {
                self.guard.release(request_id);
                return Err(e);
            }
        };

        self.guard.mark_seen(request_id);
        info!(
            region = self.region(),
            entity_id = %record.id,
            version = record.version,
            request_id,
            "Command committed"
        );

        self.publish_with_retry(record).await
    }

    async fn write(&self, command: &UpdateCommand) -> Result<EntityRecord, CommandError> {
        let write = self.store.conditional_update(
            command.id,
            command.update,
            command.expected_version,
            &self.config.region,
            self.clock.now(),
        );

        match timeout(self.config.io_timeout, write).await {
            Ok(Ok(Some(record))) => Ok(record),
            Ok(Ok(None)) => {
                debug!(
                    region = self.region(),
                    entity_id = %command.id,
                    expected_version = command.expected_version,
                    "Version conflict"
                );
                Err(CommandError::VersionConflict {
                    id: command.id,
                    expected_version: command.expected_version,
                })
            }
            Ok(Err(e)) => {
                warn!(region = self.region(), entity_id = %command.id, error = %e, "Store write failed");
                Err(CommandError::Store(e))
            }
            Err(_) => Err(CommandError::Timeout {
                timeout_ms: self.config.io_timeout.as_millis() as u64,
            }),
        }
    }

    /// Publish a committed record, retrying with a doubling delay.
    async fn publish_with_retry(&self, record: EntityRecord) -> Result<EntityRecord, CommandError> {
        let event = ReplicationEvent::new(record);
        let key = event.key();
        let payload = match event.encode() {
            Ok(payload) => payload,
            Err(e) => return Err(self.replication_pending(event.record, e)),
        };

        let mut delay = self.config.publish_retry_delay;
        let mut attempt = 0;
        loop {
            let result = timeout(
                self.config.io_timeout,
                self.publisher.publish(&self.config.topic, &key, payload.clone()),
            )
            .await
            .unwrap_or_else(|_| {
                Err(BusError::Timeout {
                    timeout_ms: self.config.io_timeout.as_millis() as u64,
                })
            });

            match result {
                Ok(ack) => {
                    debug!(
                        region = self.region(),
                        entity_id = %event.record.id,
                        partition = ack.partition,
                        offset = ack.offset,
                        "Replication event published"
                    );
                    return Ok(event.record);
                }
                Err(e) if attempt < self.config.publish_retries => {
                    attempt += 1;
                    warn!(
                        region = self.region(),
                        entity_id = %event.record.id,
                        attempt,
                        error = %e,
                        "Publish failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    delay = delay.saturating_mul(2).min(Duration::from_secs(5));
                }
                Err(e) => return Err(self.replication_pending(event.record, e)),
            }
        }
    }

    fn replication_pending(&self, record: EntityRecord, source: BusError) -> CommandError {
        error!(
            region = self.region(),
            entity_id = %record.id,
            version = record.version,
            error = %source,
            "Committed write not replicated"
        );
        CommandError::ReplicationPending {
            record: Box::new(record),
            source,
        }
    }
}
