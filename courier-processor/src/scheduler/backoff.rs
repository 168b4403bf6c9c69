//! Adaptive poll delay
//!
//! Idle polls stretch the delay geometrically up to a ceiling; any poll that
//! finds work snaps it back to the floor.

use std::time::Duration;

/// Bounds and growth rate of the delay between poll cycles
#[derive(Debug, Clone, PartialEq)]
pub struct PollBackoff {
    /// Delay after a cycle that found work, and the starting delay
    pub min_delay: Duration,
    /// Ceiling reached after enough idle cycles
    pub max_delay: Duration,
    /// Growth factor applied after each idle cycle
    pub multiplier: f64,
}

impl PollBackoff {
    pub fn new(min_delay: Duration, max_delay: Duration, multiplier: f64) -> Self {
        Self {
            min_delay,
            max_delay,
            multiplier,
        }
    }

    /// Delay before the next poll, given the current one and whether the last
    /// poll claimed anything
    pub fn next_delay(&self, current: Duration, found_work: bool) -> Duration {
        if found_work {
            return self.min_delay;
        }

        let grown = current.as_secs_f64() * self.multiplier;
        if !grown.is_finite() || grown >= self.max_delay.as_secs_f64() {
            self.max_delay
        } else {
            Duration::from_secs_f64(grown).max(self.min_delay)
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.min_delay.is_zero() {
            return Err("poll min_delay must be greater than 0".to_string());
        }
        if self.max_delay < self.min_delay {
            return Err("poll max_delay must not be below min_delay".to_string());
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err("poll multiplier must be a finite number >= 1".to_string());
        }
        Ok(())
    }
}

impl Default for PollBackoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(30), 1.5)
    }
}
