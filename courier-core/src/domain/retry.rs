//! Per-entry retry policy

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How often and how patiently a transiently failing entry is retried
///
/// Retries happen across poll cycles: a failed entry goes back to `Pending`
/// with a not-before time of `now + delay_for(attempt_count)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Attempts after which a transiently failing entry becomes `Failed`
    pub max_attempts: u32,
    /// Delay after the first failed attempt
    pub base_delay: Duration,
    /// Growth factor per further attempt
    pub multiplier: f64,
    /// Upper bound for a single delay
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Whether an entry that has made `attempt_count` attempts is out of budget
    pub fn is_exhausted(&self, attempt_count: u32) -> bool {
        attempt_count >= self.max_attempts
    }

    /// Delay before the next claim, given the attempts made so far (>= 1)
    pub fn delay_for(&self, attempt_count: u32) -> Duration {
        let exponent = attempt_count.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent);
        let cap = self.max_delay.as_secs_f64();

        if !secs.is_finite() || secs >= cap {
            self.max_delay
        } else {
            Duration::from_secs_f64(secs)
        }
    }

    /// Earliest time an entry with `attempt_count` attempts may be claimed again
    ///
    /// Saturates at the latest representable time instead of overflowing.
    pub fn next_attempt_at(&self, attempt_count: u32, now: DateTime<Utc>) -> DateTime<Utc> {
        TimeDelta::from_std(self.delay_for(attempt_count))
            .ok()
            .and_then(|delay| now.checked_add_signed(delay))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            multiplier: 2.0,
            max_delay: Duration::from_secs(30),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_grows_then_caps() {
        let policy = RetryPolicy::default();
        let delays: Vec<u64> = (1..=7).map(|n| policy.delay_for(n).as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 16, 30, 30]);
    }

    #[test]
    fn test_zero_base_never_waits() {
        let policy = RetryPolicy {
            base_delay: Duration::ZERO,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.delay_for(1), Duration::ZERO);
        assert_eq!(policy.delay_for(4), Duration::ZERO);
    }

    #[test]
    fn test_huge_attempt_counts_stay_capped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(u32::MAX), Duration::from_secs(30));
    }

    #[test]
    fn test_next_attempt_at_follows_delay() {
        let policy = RetryPolicy::default();
        let now = Utc::now();
        assert_eq!(policy.next_attempt_at(1, now), now + TimeDelta::seconds(1));
        assert_eq!(policy.next_attempt_at(3, now), now + TimeDelta::seconds(4));
        assert_eq!(policy.next_attempt_at(5_000, now), now + TimeDelta::seconds(30));
    }

    #[test]
    fn test_next_attempt_at_saturates() {
        let policy = RetryPolicy {
            base_delay: Duration::MAX,
            max_delay: Duration::MAX,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.next_attempt_at(1, Utc::now()), DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn test_exhaustion() {
        let policy = RetryPolicy::default();
        assert!(!policy.is_exhausted(4));
        assert!(policy.is_exhausted(5));
        assert!(policy.is_exhausted(6));
    }
}
