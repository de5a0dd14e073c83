//! # Idempotency Guard
//!
//! Thread-safe, bounded set of request ids.
//!
//! ## Memory Bound
//!
//! - Committed markers expire `ttl` after commit
//! - At most `max_entries` committed markers are retained; the oldest go first
//! - Expiry is amortised: each mutation drains expired entries from the
//!   front of the commit-ordered queue

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use shared_types::{Clock, SystemClock};
use tracing::{debug, trace};

use crate::config::IdempotencyConfig;
use crate::domain::{Marker, MarkerState, Reservation};

struct GuardInner {
    markers: HashMap<String, Marker>,
    /// Committed ids in commit order, tagged with the marker generation.
    committed: VecDeque<(String, u64)>,
    committed_count: usize,
    next_generation: u64,
}

/// Tracks request ids that already produced a committed effect.
pub struct IdempotencyGuard {
    inner: Mutex<GuardInner>,
    ttl: Duration,
    max_entries: usize,
    clock: Arc<dyn Clock>,
}

impl IdempotencyGuard {
    /// Create a guard with the system clock.
    #[must_use]
    pub fn new(config: IdempotencyConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a guard with an injected clock.
    #[must_use]
    pub fn with_clock(config: IdempotencyConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Mutex::new(GuardInner {
                markers: HashMap::new(),
                committed: VecDeque::new(),
                committed_count: 0,
                next_generation: 0,
            }),
            ttl: config.ttl(),
            max_entries: config.max_entries.max(1),
            clock,
        }
    }

    /// Whether `request_id` has already produced a committed effect.
    pub fn seen(&self, request_id: &str) -> bool {
        let now = self.clock.now();
        let inner = self.inner.lock();
        inner.markers.get(request_id).is_some_and(|marker| {
            marker.state == MarkerState::Committed && !marker.is_expired(now, self.ttl)
        })
    }

    /// Record that `request_id` produced a committed effect.
    ///
    /// Replaces an in-flight reservation for the same id if one exists.
    pub fn mark_seen(&self, request_id: &str) {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        self.expire(&mut inner, now);

        let generation = inner.next_generation;
        inner.next_generation += 1;

        let previous = inner.markers.insert(
            request_id.to_string(),
            Marker {
                state: MarkerState::Committed,
                since: now,
                generation,
            },
        );
        if !matches!(previous, Some(m) if m.state == MarkerState::Committed) {
            inner.committed_count += 1;
        }
        inner.committed.push_back((request_id.to_string(), generation));

        self.enforce_capacity(&mut inner);
        trace!(request_id, "Request id committed");
    }

    /// Claim `request_id` for a command about to run.
    ///
    /// # Returns
    ///
    /// - `Reservation::Acquired` - Caller must later call `mark_seen` or `release`
    /// - `Reservation::InFlight` - Another command holds the id
    /// - `Reservation::Committed` - The id was already committed
    pub fn try_reserve(&self, request_id: &str) -> Reservation {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        self.expire(&mut inner, now);

        if let Some(marker) = inner.markers.get(request_id) {
            if !marker.is_expired(now, self.ttl) {
                return match marker.state {
                    MarkerState::Committed => Reservation::Committed,
                    MarkerState::InFlight => Reservation::InFlight,
                };
            }
            debug!(request_id, "Reclaiming expired marker");
        }

        let generation = inner.next_generation;
        inner.next_generation += 1;
        let previous = inner.markers.insert(
            request_id.to_string(),
            Marker {
                state: MarkerState::InFlight,
                since: now,
                generation,
            },
        );
        if matches!(previous, Some(m) if m.state == MarkerState::Committed) {
            inner.committed_count -= 1;
        }
        Reservation::Acquired
    }

    /// Drop an in-flight reservation whose command did not commit.
    ///
    /// Committed markers are never released.
    pub fn release(&self, request_id: &str) {
        let mut inner = self.inner.lock();
        if matches!(
            inner.markers.get(request_id),
            Some(marker) if marker.state == MarkerState::InFlight
        ) {
            inner.markers.remove(request_id);
            trace!(request_id, "Reservation released");
        }
    }

    /// Number of tracked ids, committed and in flight.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().markers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop committed markers older than the ttl.
    fn expire(&self, inner: &mut GuardInner, now: DateTime<Utc>) {
        while let Some((id, generation)) = inner.committed.front().cloned() {
            match inner.markers.get(&id) {
                Some(marker) if marker.generation == generation => {
                    if !marker.is_expired(now, self.ttl) {
                        break;
                    }
                    inner.markers.remove(&id);
                    inner.committed_count -= 1;
                }
                // Superseded entry.
                _ => {}
            }
            inner.committed.pop_front();
        }
    }

    /// Evict the oldest committed markers beyond the cap.
    fn enforce_capacity(&self, inner: &mut GuardInner) {
        while inner.committed_count > self.max_entries {
            let Some((id, generation)) = inner.committed.pop_front() else {
                break;
            };
            if matches!(inner.markers.get(&id), Some(m) if m.generation == generation) {
                inner.markers.remove(&id);
                inner.committed_count -= 1;
                debug!(request_id = %id, "Evicted oldest idempotency marker");
            }
        }
    }
}

impl Default for IdempotencyGuard {
    fn default() -> Self {
        Self::new(IdempotencyConfig::default())
    }
}
