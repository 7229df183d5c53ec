//! Retry policy for idempotent inventory reads.

use std::time::Duration;

/// Bounded retry settings for idempotent calls.
///
/// Never applied to stock writes: repeating a write whose outcome is unknown
/// could consume or return stock twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one.
    pub max_retries: u32,
    /// Delay before the first retry; doubles per attempt.
    pub backoff: Duration,
    /// Upper bound for a single delay.
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    pub fn new(max_retries: u32, backoff: Duration) -> Self {
        Self {
            max_retries,
            backoff,
            max_backoff: backoff.saturating_mul(8),
        }
    }

    /// Delay before retry number `attempt` (1-based), or `None` once retries are exhausted.
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt > self.max_retries {
            return None;
        }
        let factor = 2_u32.saturating_pow(attempt - 1);
        Some(self.backoff.saturating_mul(factor).min(self.max_backoff))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(2, Duration::from_millis(100))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delays_double_and_cap() {
        let policy = RetryPolicy {
            max_retries: 5,
            backoff: Duration::from_millis(50),
            max_backoff: Duration::from_millis(150),
        };
        assert_eq!(policy.delay_for(1), Some(Duration::from_millis(50)));
        assert_eq!(policy.delay_for(2), Some(Duration::from_millis(100)));
        assert_eq!(policy.delay_for(3), Some(Duration::from_millis(150)));
        assert_eq!(policy.delay_for(5), Some(Duration::from_millis(150)));
        assert_eq!(policy.delay_for(6), None);
    }

    #[test]
    fn test_none_never_retries() {
        assert_eq!(RetryPolicy::none().delay_for(1), None);
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 2);
        assert_eq!(policy.delay_for(1), Some(Duration::from_millis(100)));
        assert_eq!(policy.delay_for(3), None);
    }
}
