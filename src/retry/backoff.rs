use std::time::Duration;

/// Exponential backoff bounds shared by every retry helper.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffConfig {
    /// Delay before the first retry. Default: 1s.
    pub min_timeout: Duration,
    /// Ceiling for any single delay. Default: 30s.
    pub max_timeout: Duration,
    /// Growth per attempt. Default: 2.
    pub backoff_factor: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            min_timeout: Duration::from_millis(1000),
            max_timeout: Duration::from_millis(30_000),
            backoff_factor: 2.0,
        }
    }
}

impl BackoffConfig {
    pub fn new(min_timeout: Duration, max_timeout: Duration, backoff_factor: f64) -> Self {
        Self {
            min_timeout,
            max_timeout,
            backoff_factor,
        }
    }

    /// Delay before retrying after attempt `attempt` (0-indexed):
    /// `min(min_timeout * backoff_factor^attempt, max_timeout)`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let millis = self.min_timeout.as_millis() as f64 * self.backoff_factor.powi(exponent);
        let cap = self.max_timeout.as_millis() as f64;
        // NaN and infinity both fall through to the ceiling
        if millis.is_finite() && millis < cap {
            Duration::from_millis(millis.max(0.0) as u64)
        } else {
            self.max_timeout
        }
    }
}
