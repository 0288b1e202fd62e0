//! Fixed-Delay Reconnection Policy
//!
//! The notification channel retries a bounded number of times with a fixed
//! delay between attempts. After the budget is exhausted the channel stays
//! disconnected until it is reopened.

use std::time::Duration;

use crate::config::ChannelSettings;

/// Bounded fixed-delay retry schedule.
#[derive(Debug)]
pub struct RetryPolicy {
    /// Delay between attempts.
    delay: Duration,
    /// Maximum attempts before giving up.
    max_attempts: u32,
    /// Current attempt count.
    current_attempt: u32,
}

impl RetryPolicy {
    /// Create a policy from channel settings.
    #[must_use]
    pub const fn new(settings: &ChannelSettings) -> Self {
        Self {
            delay: settings.reconnect_delay,
            max_attempts: settings.max_connect_attempts,
            current_attempt: 0,
        }
    }

    /// Create with custom parameters.
    #[must_use]
    pub const fn with_params(delay: Duration, max_attempts: u32) -> Self {
        Self {
            delay,
            max_attempts,
            current_attempt: 0,
        }
    }

    /// The delay before the next attempt, or `None` once the attempt budget
    /// is exhausted.
    #[must_use]
    pub const fn next_delay(&mut self) -> Option<Duration> {
        if self.current_attempt >= self.max_attempts {
            return None;
        }
        self.current_attempt += 1;
        Some(self.delay)
    }

    /// Reset after a successful join.
    pub const fn reset(&mut self) {
        self.current_attempt = 0;
    }

    /// Get the current attempt count.
    #[must_use]
    pub const fn current_attempt(&self) -> u32 {
        self.current_attempt
    }

    /// Check if another attempt remains in the budget.
    #[must_use]
    pub const fn should_retry(&self) -> bool {
        self.current_attempt < self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_delay_schedule() {
        let mut policy = RetryPolicy::with_params(Duration::from_secs(1), 5);

        for attempt in 1..=5 {
            assert_eq!(policy.next_delay(), Some(Duration::from_secs(1)));
            assert_eq!(policy.current_attempt(), attempt);
        }
        assert_eq!(policy.next_delay(), None);
        assert!(!policy.should_retry());
    }

    #[test]
    fn reset_restores_budget() {
        let mut policy = RetryPolicy::with_params(Duration::from_millis(100), 2);

        let _ = policy.next_delay();
        let _ = policy.next_delay();
        assert_eq!(policy.next_delay(), None);

        policy.reset();
        assert_eq!(policy.current_attempt(), 0);
        assert_eq!(policy.next_delay(), Some(Duration::from_millis(100)));
    }

    #[test]
    fn from_settings() {
        let policy = RetryPolicy::new(&ChannelSettings::default());
        assert!(policy.should_retry());
        assert_eq!(policy.current_attempt(), 0);
    }
}
