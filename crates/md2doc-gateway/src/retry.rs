//! Retry policy with exponential backoff and jitter.

use std::time::Duration;

use rand::RngExt;

/// Bounds for retrying retryable dispatch failures.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    /// Total submission attempts per call (first try included).
    pub max_attempts: u32,
    /// Base delay before the first retry.
    pub base_delay: Duration,
    /// Upper bound on any single delay, hint or computed.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(16),
        }
    }
}

impl RetryPolicy {
    /// Policy with zero delays, for tests.
    #[must_use]
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay before retry number `retry` (0-based).
    ///
    /// A server-provided hint wins (capped at `max_delay`); otherwise the
    /// base delay doubles per retry with equal jitter, so concurrent
    /// conversions do not retry in lockstep.
    #[must_use]
    pub fn delay(&self, retry: u32, hint: Option<Duration>) -> Duration {
        if let Some(hint) = hint {
            return hint.min(self.max_delay);
        }
        let exponential = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(retry))
            .min(self.max_delay);
        let half = exponential / 2;
        let jitter_ms = u64::try_from(half.as_millis()).unwrap_or(u64::MAX);
        if jitter_ms == 0 {
            return exponential;
        }
        half + Duration::from_millis(rand::rng().random_range(0..=jitter_ms))
    }
}
