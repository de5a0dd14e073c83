//! # Shared Bus - Replication Event Log Adapter
//!
//! Typed publish/subscribe over one logical, ordered, at-least-once and
//! replayable topic.
//!
//! ## Contract
//!
//! - **Per-key ordering:** all events for one entity id are delivered to a
//!   consumer in publish order. Version-guarded apply relies on this.
//! - **Replayable:** a subscriber may start from the earliest retained entry.
//! - **At-least-once:** a reconnecting consumer sees entries again; applying
//!   them must be idempotent.
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────┐
//! │  Region US   │                    │  Region EU   │
//! │  (commands)  │    publish()       │ (coordinator)│
//! │              │ ──────┐            │              │
//! └──────────────┘       │            └──────────────┘
//!                        ▼                    ↑
//!                  ┌──────────────┐          │
//!                  │  Event Log   │          │
//!                  │ (partitioned)│ ─────────┘
//!                  └──────────────┘  subscribe(Earliest)
//! ```
//!
//! With the `remote` feature one node serves its log over HTTP and nodes
//! in other processes publish to and subscribe from it.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod events;
pub mod publisher;
#[cfg(feature = "remote")]
pub mod remote;
pub mod subscriber;

// Re-export main types
pub use events::{partition_for, DecodeError, ReplicationEvent};
pub use publisher::{EventPublisher, InMemoryEventLog, PublishAck};
pub use subscriber::{EventSubscriber, EventSubscription, LogEntry, SubscribeFrom};
#[cfg(feature = "remote")]
pub use remote::{log_router, serve_log, RemoteEventLog, RemoteLogConfig};

/// Topic carrying committed entity writes between regions.
pub const REPLICATION_TOPIC: &str = "property-updates";

/// Partitions per topic when not configured.
pub const DEFAULT_PARTITIONS: u32 = 8;

/// Dead Letter Queue topic for poisoned replication messages.
pub const DLQ_TOPIC: &str = "property-updates.dlq";
