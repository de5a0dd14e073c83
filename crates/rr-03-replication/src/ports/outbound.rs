use async_trait::async_trait;
use shared_bus::LogEntry;

/// Why an entry was dead-lettered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeadLetterReason {
    /// The payload could not be decoded.
    Poisoned(String),
    /// The record store rejected or timed out on the write.
    StoreFailure(String),
}

impl DeadLetterReason {
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Poisoned(_) => "poisoned",
            Self::StoreFailure(_) => "store_failure",
        }
    }

    #[must_use]
    pub fn detail(&self) -> &str {
        match self {
            Self::Poisoned(detail) | Self::StoreFailure(detail) => detail,
        }
    }
}

/// An inbound entry the coordinator skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadLetter {
    pub entry: LogEntry,
    pub reason: DeadLetterReason,
}

/// Destination for skipped entries.
///
/// Sinks must not fail the caller: delivery problems are theirs to log.
#[async_trait]
pub trait DeadLetterSink: Send + Sync {
    async fn send(&self, letter: DeadLetter);
}
