//! Capped exponential backoff with jitter.
//!
//! The nth delay is drawn uniformly from `[d/2, d]` where
//! `d = min(base * 2^n, max)`. Jitter keeps regions that lost the broker at
//! the same moment from reconnecting in lockstep.

use std::time::Duration;

use rand::Rng;

use crate::config::BackoffConfig;

/// Backoff sequence for one run of failures.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    base: Duration,
    max: Duration,
    attempt: u32,
}

impl ExponentialBackoff {
    pub fn new(config: &BackoffConfig) -> Self {
        Self {
            base: config.base,
            max: config.max.max(config.base),
            attempt: 0,
        }
    }

    /// Upper bound of the next delay, before jitter.
    #[must_use]
    pub fn ceiling(&self) -> Duration {
        let factor = 2u32.saturating_pow(self.attempt.min(31));
        self.base.saturating_mul(factor).min(self.max)
    }

    /// Next delay. Advances the sequence.
    pub fn next_delay(&mut self) -> Duration {
        let ceiling = self.ceiling();
        self.attempt = self.attempt.saturating_add(1);

        let high = ceiling.as_millis() as u64;
        let low = high / 2;
        if high == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(low..=high))
    }

    /// Attempts since the last reset.
    #[must_use]
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Start over after a successful connection.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}
