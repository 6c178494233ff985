//! # Failure Backoff
//!
//! Exponential backoff for retrying failed App reconciles.
//!
//! Each consecutive failure doubles the delay, starting at `base` and capped
//! at `max`. Per-App instances live in `BackoffStates`, which drops an App's
//! entry after a successful reconcile.
//!
//! ## Usage
//!
//! ```rust
//! use app_controller::controller::backoff::FailureBackoff;
//! use std::time::Duration;
//!
//! let mut backoff = FailureBackoff::new(Duration::from_secs(1), Duration::from_secs(10));
//! assert_eq!(backoff.next_backoff(), Duration::from_secs(1));
//! assert_eq!(backoff.next_backoff(), Duration::from_secs(2));
//! assert_eq!(backoff.next_backoff(), Duration::from_secs(4));
//! assert_eq!(backoff.next_backoff(), Duration::from_secs(8));
//! assert_eq!(backoff.next_backoff(), Duration::from_secs(10));
//! ```

use std::time::Duration;

/// Exponential backoff calculator
///
/// Returns `base * 2^(failures - 1)` for the n-th consecutive failure,
/// never more than `max`.
#[derive(Debug, Clone)]
pub struct FailureBackoff {
    base: Duration,
    max: Duration,
    /// Consecutive failures recorded
    failures: u32,
}

impl FailureBackoff {
    #[must_use]
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            failures: 0,
        }
    }

    /// Record a failure and return how long to wait before retrying
    pub fn next_backoff(&mut self) -> Duration {
        self.failures = self.failures.saturating_add(1);
        self.current()
    }

    /// Delay for the failure count recorded so far, without advancing
    #[must_use]
    pub fn current(&self) -> Duration {
        if self.failures == 0 {
            return Duration::ZERO;
        }
        // 2^31 already dwarfs any sane cap; clamp the shift so it cannot overflow.
        let factor = 1u32 << (self.failures - 1).min(31);
        self.base.saturating_mul(factor).min(self.max)
    }

    /// Number of consecutive failures recorded
    #[must_use]
    pub fn failures(&self) -> u32 {
        self.failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn test_backoff_doubles_until_cap() {
        let mut backoff = FailureBackoff::new(secs(1), secs(300));

        let delays: Vec<u64> = (0..10).map(|_| backoff.next_backoff().as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 16, 32, 64, 128, 256, 300]);
        assert_eq!(backoff.next_backoff(), secs(300));
    }

    #[test]
    fn test_fresh_backoff_has_no_delay() {
        let backoff = FailureBackoff::new(secs(2), secs(60));
        assert_eq!(backoff.failures(), 0);
        assert_eq!(backoff.current(), Duration::ZERO);
    }

    #[test]
    fn test_backoff_many_failures_does_not_overflow() {
        let mut backoff = FailureBackoff::new(secs(1), secs(300));
        for _ in 0..100 {
            backoff.next_backoff();
        }
        assert_eq!(backoff.current(), secs(300));
    }

    #[test]
    fn test_backoff_per_app_state_is_independent() {
        let mut first = FailureBackoff::new(secs(1), secs(300));
        let mut second = FailureBackoff::new(secs(1), secs(300));

        first.next_backoff();
        first.next_backoff();
        assert_eq!(first.next_backoff(), secs(4));
        assert_eq!(second.next_backoff(), secs(1));
    }
}
