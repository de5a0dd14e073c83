//! # Event Subscriber
//!
//! Defines the consuming side of the event log.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared_types::BusError;
use tokio::sync::watch;
use tracing::debug;

use crate::publisher::LogInner;

/// A single durable entry of the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub topic: String,
    pub partition: u32,
    /// Position within the topic. Dense, starting at zero.
    pub offset: u64,
    pub key: String,
    pub payload: Vec<u8>,
    pub published_at: DateTime<Utc>,
}

/// Where a new subscription starts reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeFrom {
    /// Replay all retained history.
    Earliest,
    /// Resume at a known offset.
    Offset(u64),
}

/// An open, ordered stream of log entries.
#[async_trait]
pub trait EventSubscription: Send {
    /// Wait for the next entry.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(entry))` - The next entry in log order
    /// - `Ok(None)` - The log was shut down
    /// - `Err(_)` - Transport failure; the caller should reconnect
    async fn next(&mut self) -> Result<Option<LogEntry>, BusError>;
}

/// Trait for opening subscriptions on the log.
#[async_trait]
pub trait EventSubscriber: Send + Sync {
    /// Subscribe to a topic.
    async fn subscribe(
        &self,
        topic: &str,
        from: SubscribeFrom,
    ) -> Result<Box<dyn EventSubscription>, BusError>;
}

/// Subscription over an [`InMemoryEventLog`](crate::InMemoryEventLog).
pub struct InMemorySubscription {
    inner: Arc<LogInner>,
    topic: String,
    next_offset: u64,
    changes: watch::Receiver<u64>,
}

impl InMemorySubscription {
    pub(crate) fn new(inner: Arc<LogInner>, topic: String, next_offset: u64) -> Self {
        let changes = inner.notifier.subscribe();
        Self {
            inner,
            topic,
            next_offset,
            changes,
        }
    }

    /// Offset of the next entry this subscription will return.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.next_offset
    }
}

#[async_trait]
impl EventSubscription for InMemorySubscription {
    async fn next(&mut self) -> Result<Option<LogEntry>, BusError> {
        loop {
            // Mark the current notification as seen before looking, so a
            // publish racing with the check still wakes us.
            self.changes.borrow_and_update();

            if self.inner.closed.load(Ordering::Acquire) {
                return Ok(None);
            }
            if !self.inner.available.load(Ordering::Acquire) {
                return Err(BusError::Unavailable("broker connection lost".into()));
            }

            let entry = {
                let topics = self.inner.topics.read();
                topics
                    .get(&self.topic)
                    .and_then(|entries| entries.get(self.next_offset as usize))
                    .cloned()
            };

            if let Some(entry) = entry {
                self.next_offset += 1;
                return Ok(Some(entry));
            }

            if self.changes.changed().await.is_err() {
                debug!(topic = %self.topic, "Event log dropped");
                return Ok(None);
            }
        }
    }
}
