//! # Event Publisher
//!
//! Defines the publishing side of the event log and the in-memory log used
//! by single-host deployments and tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use shared_types::BusError;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::events::partition_for;
use crate::subscriber::{
    EventSubscriber, EventSubscription, InMemorySubscription, LogEntry, SubscribeFrom,
};
use crate::DEFAULT_PARTITIONS;

/// Acknowledgement for a durably appended entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishAck {
    pub partition: u32,
    pub offset: u64,
}

/// Trait for publishing events to the log.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Append a payload to `topic`, partitioned by `key`.
    ///
    /// # Returns
    ///
    /// The position the entry was written at once it is durable.
    async fn publish(&self, topic: &str, key: &str, payload: Vec<u8>)
        -> Result<PublishAck, BusError>;
}

pub(crate) struct LogInner {
    pub(crate) topics: RwLock<HashMap<String, Vec<LogEntry>>>,
    pub(crate) available: AtomicBool,
    pub(crate) closed: AtomicBool,
    /// Bumped on every append and availability change to wake subscribers.
    pub(crate) notifier: watch::Sender<u64>,
    partitions: u32,
    failing_publishes: AtomicU32,
    events_published: AtomicU64,
}

impl LogInner {
    fn notify(&self) {
        self.notifier.send_modify(|generation| *generation = generation.wrapping_add(1));
    }
}

/// In-memory implementation of the event log.
///
/// Every topic is a single totally ordered vector, so entries for the same
/// key are delivered in publish order. History is retained for the life of
/// the log and any subscriber may replay it from offset zero. Suitable for
/// hosting several regions in one process; distributed deployments would
/// use a broker-backed implementation of the same traits.
#[derive(Clone)]
pub struct InMemoryEventLog {
    inner: Arc<LogInner>,
}

impl InMemoryEventLog {
    /// Create a new in-memory log with the default partition count.
    #[must_use]
    pub fn new() -> Self {
        Self::with_partitions(DEFAULT_PARTITIONS)
    }

    /// Create a new in-memory log with a specified partition count.
    #[must_use]
    pub fn with_partitions(partitions: u32) -> Self {
        let (notifier, _) = watch::channel(0);
        Self {
            inner: Arc::new(LogInner {
                topics: RwLock::new(HashMap::new()),
                available: AtomicBool::new(true),
                closed: AtomicBool::new(false),
                notifier,
                partitions: partitions.max(1),
                failing_publishes: AtomicU32::new(0),
                events_published: AtomicU64::new(0),
            }),
        }
    }

    /// Simulate broker loss or recovery.
    ///
    /// While unavailable, publishes and new subscriptions fail and open
    /// subscriptions return a transport error on their next read.
    pub fn set_available(&self, available: bool) {
        let previous = self.inner.available.swap(available, Ordering::AcqRel);
        if previous != available {
            info!(available, "Event log availability changed");
        }
        self.inner.notify();
    }

    /// Make the next `count` publishes fail with a transport error.
    pub fn fail_next_publishes(&self, count: u32) {
        self.inner.failing_publishes.store(count, Ordering::Release);
    }

    /// Close the log. Open subscriptions end cleanly.
    pub fn shutdown(&self) {
        self.inner.closed.store(true, Ordering::Release);
        self.inner.notify();
    }

    /// Number of entries retained in `topic`.
    #[must_use]
    pub fn len(&self, topic: &str) -> usize {
        self.inner.topics.read().get(topic).map_or(0, Vec::len)
    }

    /// Snapshot of all entries retained in `topic`.
    #[must_use]
    pub fn entries(&self, topic: &str) -> Vec<LogEntry> {
        self.inner.topics.read().get(topic).cloned().unwrap_or_default()
    }

    /// Up to `limit` entries of `topic` starting at offset `from`.
    ///
    /// Empty once `from` is past the end. Fails like a subscription would
    /// while the log is unavailable or closed.
    pub fn read(&self, topic: &str, from: u64, limit: usize) -> Result<Vec<LogEntry>, BusError> {
        self.check_available()?;
        let topics = self.inner.topics.read();
        let Some(entries) = topics.get(topic) else {
            return Ok(Vec::new());
        };
        let start = usize::try_from(from).unwrap_or(usize::MAX).min(entries.len());
        Ok(entries[start..].iter().take(limit).cloned().collect())
    }

    /// Get the total number of events published.
    #[must_use]
    pub fn events_published(&self) -> u64 {
        self.inner.events_published.load(Ordering::Relaxed)
    }

    /// Get the partition count.
    #[must_use]
    pub fn partitions(&self) -> u32 {
        self.inner.partitions
    }

    fn check_available(&self) -> Result<(), BusError> {
        if self.inner.closed.load(Ordering::Acquire) {
            return Err(BusError::Closed);
        }
        if !self.inner.available.load(Ordering::Acquire) {
            return Err(BusError::Unavailable("broker unreachable".into()));
        }
        Ok(())
    }

    fn take_injected_failure(&self) -> bool {
        self.inner
            .failing_publishes
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl Default for InMemoryEventLog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventLog {
    async fn publish(
        &self,
        topic: &str,
        key: &str,
        payload: Vec<u8>,
    ) -> Result<PublishAck, BusError> {
        self.check_available()?;

        if self.take_injected_failure() {
            warn!(topic, key, "Publish failed (injected)");
            return Err(BusError::Unavailable("publish rejected by broker".into()));
        }

        let partition = partition_for(key, self.inner.partitions);
        let offset = {
            let mut topics = self.inner.topics.write();
            let entries = topics.entry(topic.to_string()).or_default();
            let offset = entries.len() as u64;
            entries.push(LogEntry {
                topic: topic.to_string(),
                partition,
                offset,
                key: key.to_string(),
                payload,
                published_at: Utc::now(),
            });
            offset
        };

        self.inner.events_published.fetch_add(1, Ordering::Relaxed);
        self.inner.notify();

        debug!(topic, key, partition, offset, "Event published");
        Ok(PublishAck { partition, offset })
    }
}

#[async_trait]
impl EventSubscriber for InMemoryEventLog {
    async fn subscribe(
        &self,
        topic: &str,
        from: SubscribeFrom,
    ) -> Result<Box<dyn EventSubscription>, BusError> {
        self.check_available()?;

        let start = match from {
            SubscribeFrom::Earliest => 0,
            SubscribeFrom::Offset(offset) => offset,
        };

        debug!(topic, start, "New subscription created");
        Ok(Box::new(InMemorySubscription::new(
            Arc::clone(&self.inner),
            topic.to_string(),
            start,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_assigns_dense_offsets() {
        let log = InMemoryEventLog::new();

        let first = log.publish("t", "1", vec![1]).await.unwrap();
        let second = log.publish("t", "2", vec![2]).await.unwrap();

        assert_eq!(first.offset, 0);
        assert_eq!(second.offset, 1);
        assert_eq!(log.len("t"), 2);
        assert_eq!(log.events_published(), 2);
    }

    #[tokio::test]
    async fn test_same_key_same_partition() {
        let log = InMemoryEventLog::with_partitions(16);

        let a = log.publish("t", "7", vec![]).await.unwrap();
        let b = log.publish("t", "7", vec![]).await.unwrap();

        assert_eq!(a.partition, b.partition);
        assert!(a.offset < b.offset);
    }

    #[tokio::test]
    async fn test_replay_from_earliest() {
        let log = InMemoryEventLog::new();
        log.publish("t", "1", b"a".to_vec()).await.unwrap();
        log.publish("t", "1", b"b".to_vec()).await.unwrap();

        let mut sub = log.subscribe("t", SubscribeFrom::Earliest).await.unwrap();
        assert_eq!(sub.next().await.unwrap().unwrap().payload, b"a".to_vec());
        assert_eq!(sub.next().await.unwrap().unwrap().payload, b"b".to_vec());
    }

    #[tokio::test]
    async fn test_subscribe_from_offset() {
        let log = InMemoryEventLog::new();
        for i in 0..3u8 {
            log.publish("t", "1", vec![i]).await.unwrap();
        }

        let mut sub = log.subscribe("t", SubscribeFrom::Offset(2)).await.unwrap();
        let entry = sub.next().await.unwrap().unwrap();
        assert_eq!(entry.offset, 2);
        assert_eq!(entry.payload, vec![2]);
    }

    #[tokio::test]
    async fn test_unavailable_rejects_publish_and_subscribe() {
        let log = InMemoryEventLog::new();
        log.set_available(false);

        assert!(matches!(
            log.publish("t", "1", vec![]).await,
            Err(BusError::Unavailable(_))
        ));
        assert!(log.subscribe("t", SubscribeFrom::Earliest).await.is_err());

        log.set_available(true);
        assert!(log.publish("t", "1", vec![]).await.is_ok());
    }

    #[tokio::test]
    async fn test_injected_publish_failures() {
        let log = InMemoryEventLog::new();
        log.fail_next_publishes(2);

        assert!(log.publish("t", "1", vec![]).await.is_err());
        assert!(log.publish("t", "1", vec![]).await.is_err());
        assert!(log.publish("t", "1", vec![]).await.is_ok());
        assert_eq!(log.len("t"), 1);
    }

    #[tokio::test]
    async fn test_read_window() {
        let log = InMemoryEventLog::new();
        for i in 0..5u8 {
            log.publish("t", "1", vec![i]).await.unwrap();
        }

        let window = log.read("t", 1, 2).unwrap();
        assert_eq!(window.iter().map(|e| e.offset).collect::<Vec<_>>(), vec![1, 2]);
        assert!(log.read("t", 9, 10).unwrap().is_empty());
        assert!(log.read("missing", 0, 10).unwrap().is_empty());

        log.shutdown();
        assert_eq!(log.read("t", 0, 1), Err(BusError::Closed));
    }

    #[test]
    fn test_default_log() {
        let log = InMemoryEventLog::default();
        assert_eq!(log.partitions(), DEFAULT_PARTITIONS);
        assert_eq!(log.events_published(), 0);
        assert_eq!(log.len("anything"), 0);
    }
}
