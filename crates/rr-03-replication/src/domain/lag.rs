//! # Replication Lag
//!
//! `ReplicationLagState` holds the `updated_at` of the most recently
//! applied remote event. The coordinator is its only writer; readers take
//! lock-free snapshots.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use shared_types::Clock;

const NEVER_APPLIED: i64 = i64::MIN;

/// Timestamp of the most recently applied remote event.
#[derive(Debug)]
pub struct ReplicationLagState {
    last_applied_micros: AtomicI64,
}

impl ReplicationLagState {
    pub fn new() -> Self {
        Self {
            last_applied_micros: AtomicI64::new(NEVER_APPLIED),
        }
    }

    /// Record an applied event's commit time.
    ///
    /// Monotone: an older timestamp never replaces a newer one.
    pub fn record(&self, updated_at: DateTime<Utc>) {
        self.last_applied_micros
            .fetch_max(updated_at.timestamp_micros(), Ordering::AcqRel);
    }

    /// Commit time of the last applied remote event, if any.
    #[must_use]
    pub fn last_applied(&self) -> Option<DateTime<Utc>> {
        match self.last_applied_micros.load(Ordering::Acquire) {
            NEVER_APPLIED => None,
            micros => DateTime::<Utc>::from_timestamp_micros(micros),
        }
    }
}

impl Default for ReplicationLagState {
    fn default() -> Self {
        Self::new()
    }
}

/// Body of `GET /replication-lag`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LagReport {
    pub lag_seconds: f64,
    pub last_applied_at: Option<DateTime<Utc>>,
}

/// Derives the observable lag metric.
#[derive(Clone)]
pub struct LagReporter {
    state: Arc<ReplicationLagState>,
    clock: Arc<dyn Clock>,
}

impl LagReporter {
    pub fn new(state: Arc<ReplicationLagState>, clock: Arc<dyn Clock>) -> Self {
        Self { state, clock }
    }

    /// Seconds between now and the last applied event, to two decimals.
    ///
    /// `0` when nothing was ever applied, and when clock skew puts the
    /// event in the future.
    #[must_use]
    pub fn current_lag_seconds(&self) -> f64 {
        let Some(last) = self.state.last_applied() else {
            return 0.0;
        };
        let elapsed_ms = self
            .clock
            .now()
            .signed_duration_since(last)
            .num_milliseconds()
            .max(0);
        (elapsed_ms as f64 / 10.0).round() / 100.0
    }

    /// Lag plus the timestamp it was computed from.
    #[must_use]
    pub fn report(&self) -> LagReport {
        LagReport {
            lag_seconds: self.current_lag_seconds(),
            last_applied_at: self.state.last_applied(),
        }
    }
}
