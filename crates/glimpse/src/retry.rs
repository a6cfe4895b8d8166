//! Bounded retry policy for transient faults.
//!
//! `Network` and `Timeout` failures are retried until `max_attempts` is
//! reached; every other failure is final on the first attempt. Delays are
//! capped so a flaky network can never stall a request for long.

use std::time::Duration;

use glimpseconf::{BackoffKind, EngineSection};

use crate::types::FailureKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first; never below 1
    pub max_attempts: u32,
    pub backoff: BackoffKind,
    /// Delay before the first retry
    pub backoff_base: Duration,
    /// Cap for any single delay
    pub backoff_max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: BackoffKind::Exponential,
            backoff_base: Duration::from_millis(250),
            backoff_max: Duration::from_secs(4),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    pub fn from_section(engine: &EngineSection) -> Self {
        Self {
            max_attempts: engine.max_attempts.max(1),
            backoff: engine.backoff,
            backoff_base: Duration::from_millis(engine.backoff_base_ms),
            backoff_max: Duration::from_millis(engine.backoff_max_ms),
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffKind, base: Duration, max: Duration) -> Self {
        self.backoff = backoff;
        self.backoff_base = base;
        self.backoff_max = max;
        self
    }

    /// Should a request that just failed `attempt` (1-based) with `kind`
    /// be tried again?
    pub fn should_retry(&self, kind: FailureKind, attempt: u32) -> bool {
        kind.is_retryable() && attempt < self.max_attempts.max(1)
    }

    /// Delay before retry number `retry` (1 = first retry).
    ///
    /// Exponential: retry 1 waits `base`, retry n waits
    /// `min(base * 2^(n-1), max)`. Fixed: always `min(base, max)`.
    pub fn backoff_for_retry(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }
        let delay = match self.backoff {
            BackoffKind::Fixed => self.backoff_base,
            BackoffKind::Exponential => {
                let multiplier = 2u32.saturating_pow(retry - 1);
                self.backoff_base.saturating_mul(multiplier)
            }
        };
        std::cmp::min(delay, self.backoff_max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exponential_backoff_is_capped() {
        let policy = RetryPolicy::default().with_backoff(
            BackoffKind::Exponential,
            Duration::from_millis(100),
            Duration::from_secs(5),
        );

        assert_eq!(policy.backoff_for_retry(0), Duration::ZERO);
        assert_eq!(policy.backoff_for_retry(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_for_retry(2), Duration::from_millis(200));
        assert_eq!(policy.backoff_for_retry(3), Duration::from_millis(400));
        // 100ms * 64 = 6.4s, capped
        assert_eq!(policy.backoff_for_retry(7), Duration::from_secs(5));
        assert_eq!(policy.backoff_for_retry(100), Duration::from_secs(5));
    }

    #[test]
    fn fixed_backoff() {
        let policy = RetryPolicy::default().with_backoff(
            BackoffKind::Fixed,
            Duration::from_millis(300),
            Duration::from_secs(1),
        );
        assert_eq!(policy.backoff_for_retry(1), Duration::from_millis(300));
        assert_eq!(policy.backoff_for_retry(9), Duration::from_millis(300));
    }

    #[test]
    fn retries_are_bounded() {
        let policy = RetryPolicy::default().with_max_attempts(3);
        assert!(policy.should_retry(FailureKind::Network, 1));
        assert!(policy.should_retry(FailureKind::Timeout, 2));
        assert!(!policy.should_retry(FailureKind::Timeout, 3));
        assert!(!policy.should_retry(FailureKind::Unauthorized, 1));
        assert!(!policy.should_retry(FailureKind::UnsupportedFeature, 1));
    }

    #[test]
    fn zero_attempts_means_one() {
        let policy = RetryPolicy::default().with_max_attempts(0);
        assert_eq!(policy.max_attempts, 1);
        assert!(!policy.should_retry(FailureKind::Network, 1));

        let engine = EngineSection {
            max_attempts: 0,
            ..Default::default()
        };
        assert_eq!(RetryPolicy::from_section(&engine).max_attempts, 1);
    }
}
