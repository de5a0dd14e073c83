use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use shared_bus::{EventPublisher, DLQ_TOPIC};
use tracing::{error, warn};

use crate::ports::{DeadLetter, DeadLetterSink};

/// Records skipped entries in the log only.
#[derive(Debug, Default)]
pub struct LoggingDeadLetterSink;

#[async_trait]
impl DeadLetterSink for LoggingDeadLetterSink {
    async fn send(&self, letter: DeadLetter) {
        warn!(
            topic = %letter.entry.topic,
            offset = letter.entry.offset,
            key = %letter.entry.key,
            reason = letter.reason.label(),
            detail = letter.reason.detail(),
            "Skipping replication entry"
        );
    }
}

/// Keeps skipped entries for inspection.
#[derive(Debug, Default)]
pub struct InMemoryDeadLetterSink {
    letters: Mutex<Vec<DeadLetter>>,
}

impl InMemoryDeadLetterSink {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn letters(&self) -> Vec<DeadLetter> {
        self.letters.lock().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.letters.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.letters.lock().is_empty()
    }
}

#[async_trait]
impl DeadLetterSink for InMemoryDeadLetterSink {
    async fn send(&self, letter: DeadLetter) {
        self.letters.lock().push(letter);
    }
}

/// Republishes skipped entries, unchanged, to the dead-letter topic.
///
/// Each publish is bounded by `publish_timeout`; a letter that cannot be
/// delivered in time is logged and dropped.
pub struct BusDeadLetterSink {
    publisher: Arc<dyn EventPublisher>,
    topic: String,
    publish_timeout: Duration,
}

impl BusDeadLetterSink {
    pub fn new(publisher: Arc<dyn EventPublisher>, publish_timeout: Duration) -> Self {
        Self {
            publisher,
            topic: DLQ_TOPIC.to_string(),
            publish_timeout,
        }
    }
}

#[async_trait]
impl DeadLetterSink for BusDeadLetterSink {
    async fn send(&self, letter: DeadLetter) {
        LoggingDeadLetterSink.send(letter.clone()).await;

        let DeadLetter { entry, reason } = letter;
        let publish = self.publisher.publish(&self.topic, &entry.key, entry.payload);
        match tokio::time::timeout(self.publish_timeout, publish).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => error!(
                offset = entry.offset,
                reason = reason.label(),
                error = %e,
                "Failed to publish dead letter"
            ),
            Err(_) => error!(
                offset = entry.offset,
                reason = reason.label(),
                timeout_ms = self.publish_timeout.as_millis() as u64,
                "Dead letter publish timed out"
            ),
        }
    }
}
