use std::time::Duration;

use vidgrid_core::EngineConfig;

/// Upper bound on a single backoff step.
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Exponential backoff for failed loads: `base`, `2 * base`, `4 * base`, ...
/// for up to `attempts` retries, then the error sticks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            attempts: config.retry_attempts,
            base_delay: config.retry_base_delay(),
            max_delay: MAX_RETRY_DELAY,
        }
    }

    /// Whether the item gets another automatic try after `failures` failures.
    pub fn allows(&self, failures: u32) -> bool {
        failures <= self.attempts
    }

    /// Wait before the retry that follows failure number `failures` (1-based).
    pub fn delay_for(&self, failures: u32) -> Duration {
        let shift = failures.saturating_sub(1).min(31);
        self.base_delay
            .checked_mul(1u32 << shift)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_until_capped() {
        let p = RetryPolicy {
            attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(3),
        };
        assert_eq!(p.delay_for(1), Duration::from_millis(500));
        assert_eq!(p.delay_for(2), Duration::from_millis(1000));
        assert_eq!(p.delay_for(3), Duration::from_millis(2000));
        assert_eq!(p.delay_for(4), Duration::from_secs(3));
        assert_eq!(p.delay_for(200), Duration::from_secs(3));
    }

    #[test]
    fn attempts_bound_automatic_retries() {
        let p = RetryPolicy {
            attempts: 2,
            ..RetryPolicy::default()
        };
        assert!(p.allows(1));
        assert!(p.allows(2));
        assert!(!p.allows(3));

        let none = RetryPolicy {
            attempts: 0,
            ..RetryPolicy::default()
        };
        assert!(!none.allows(1));
    }
}
