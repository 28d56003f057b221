use crate::config::duration;
use crate::error::{JoghdError, Result};
use serde::Deserialize;
use std::time::Duration;

/// Bounded-attempt exponential backoff policy for a single check
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first, at least 1
    pub max_attempts: u32,
    /// Wait before the second attempt
    #[serde(deserialize_with = "duration::deserialize")]
    pub initial_wait: Duration,
    /// Upper bound on any single wait
    #[serde(deserialize_with = "duration::deserialize")]
    pub max_wait: Duration,
    /// Growth factor per attempt; values <= 1 keep the wait constant
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_wait: Duration::from_secs(1),
            max_wait: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Wait to apply after failed attempt number `attempt` (1-based):
    /// `min(max_wait, initial_wait * multiplier^(attempt-1))`
    pub fn backoff(&self, attempt: u32) -> Duration {
        if self.initial_wait.is_zero() {
            return Duration::ZERO;
        }
        if self.multiplier <= 1.0 {
            return self.initial_wait.min(self.max_wait);
        }

        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.initial_wait.as_secs_f64() * self.multiplier.powi(exponent);

        if !secs.is_finite() || secs >= self.max_wait.as_secs_f64() {
            return self.max_wait;
        }

        Duration::try_from_secs_f64(secs).unwrap_or(self.max_wait)
    }

    /// Check the policy's invariants
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts < 1 {
            return Err(JoghdError::invalid_config(
                "retry.max_attempts must be at least 1",
                "Set retry.max_attempts = 1 to disable retries",
            ));
        }
        if self.max_wait < self.initial_wait {
            return Err(JoghdError::invalid_config(
                format!(
                    "retry.max_wait ({:?}) is shorter than retry.initial_wait ({:?})",
                    self.max_wait, self.initial_wait
                ),
                "Raise retry.max_wait or lower retry.initial_wait",
            ));
        }
        if !self.multiplier.is_finite() || self.multiplier <= 0.0 {
            return Err(JoghdError::invalid_config(
                format!("retry.multiplier must be positive, got {}", self.multiplier),
                "Use 1.0 for constant backoff or 2.0 to double the wait each attempt",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(initial_ms: u64, max_ms: u64, multiplier: f64) -> RetryPolicy {
        RetryPolicy {
            max_attempts: 5,
            initial_wait: Duration::from_millis(initial_ms),
            max_wait: Duration::from_millis(max_ms),
            multiplier,
        }
    }

    #[test]
    fn test_exponential_growth_and_cap() {
        let p = policy(1000, 10_000, 2.0);
        assert_eq!(p.backoff(1), Duration::from_secs(1));
        assert_eq!(p.backoff(2), Duration::from_secs(2));
        assert_eq!(p.backoff(3), Duration::from_secs(4));
        assert_eq!(p.backoff(4), Duration::from_secs(8));
        assert_eq!(p.backoff(5), Duration::from_secs(10));
        assert_eq!(p.backoff(500), Duration::from_secs(10));
    }

    #[test]
    fn test_multiplier_at_or_below_one_is_constant() {
        let p = policy(500, 10_000, 1.0);
        assert_eq!(p.backoff(1), Duration::from_millis(500));
        assert_eq!(p.backoff(4), Duration::from_millis(500));

        let p = policy(500, 10_000, 0.5);
        assert_eq!(p.backoff(3), Duration::from_millis(500));
    }

    #[test]
    fn test_zero_initial_wait() {
        let p = policy(0, 0, 2.0);
        assert_eq!(p.backoff(1), Duration::ZERO);
        assert_eq!(p.backoff(3), Duration::ZERO);

        // 0 * inf must not saturate to max_wait
        let p = RetryPolicy {
            max_attempts: 4,
            initial_wait: Duration::ZERO,
            max_wait: Duration::from_secs(10),
            multiplier: 1e300,
        };
        assert_eq!(p.backoff(3), Duration::ZERO);
        assert_eq!(p.backoff(u32::MAX), Duration::ZERO);
    }

    #[test]
    fn test_validate() {
        assert!(RetryPolicy::default().validate().is_ok());
        assert!(RetryPolicy::no_retry().validate().is_ok());

        let mut p = RetryPolicy::default();
        p.max_attempts = 0;
        assert!(p.validate().is_err());

        let p = policy(5000, 1000, 2.0);
        assert!(p.validate().is_err());

        let p = policy(1000, 5000, 0.0);
        assert!(p.validate().is_err());

        let p = policy(1000, 5000, f64::NAN);
        assert!(p.validate().is_err());
    }
}
