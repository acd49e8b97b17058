// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Retry policy shared by the batch and single-message publishers.
//!
//! Retries are bounded by attempt count only. The default policy retries
//! immediately; a delay can be configured for brokers that throttle, but
//! the number of attempts never adapts to broker feedback.
//!
//! # Example
//!
//! ```rust
//! use change_relay::resilience::RetryPolicy;
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::with_attempts(5);
//! assert_eq!(policy.delay_for_attempt(3), Duration::ZERO);
//! ```

use std::time::Duration;

/// Default number of attempts for one publish (first try included).
pub const DEFAULT_MAX_ATTEMPTS: usize = 5;

/// Bounded retry configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, first try included.
    pub max_attempts: usize,

    /// Delay before the first retry.
    pub initial_delay: Duration,

    /// Ceiling for the delay between retries.
    pub max_delay: Duration,

    /// Backoff multiplier (e.g., 2.0 = double delay each retry).
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::with_attempts(DEFAULT_MAX_ATTEMPTS)
    }
}

impl RetryPolicy {
    /// Immediate retries, `max_attempts` in total.
    pub fn with_attempts(max_attempts: usize) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_factor: 1.0,
        }
    }

    /// Fixed delay between attempts.
    pub fn fixed(max_attempts: usize, delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay: delay,
            max_delay: delay,
            backoff_factor: 1.0,
        }
    }

    /// Calculate delay before retry number `retry` (1-indexed).
    pub fn delay_for_attempt(&self, retry: usize) -> Duration {
        if retry == 0 {
            return self.initial_delay;
        }

        let multiplier = self.backoff_factor.powi((retry - 1).min(i32::MAX as usize) as i32);
        let delay_secs = self.initial_delay.as_secs_f64() * multiplier;
        if !delay_secs.is_finite() {
            return self.max_delay;
        }
        let delay = Duration::from_secs_f64(delay_secs);

        std::cmp::min(delay, self.max_delay)
    }

    /// Sleep before the given retry, if the policy has a delay.
    pub async fn wait(&self, retry: usize) {
        let delay = self.delay_for_attempt(retry);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.initial_delay, Duration::ZERO);
        assert_eq!(policy.delay_for_attempt(4), Duration::ZERO);
    }

    #[test]
    fn test_fixed_policy() {
        let policy = RetryPolicy::fixed(3, Duration::from_millis(250));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(250));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(250));
        assert_eq!(policy.delay_for_attempt(10), Duration::from_millis(250));
    }

    #[test]
    fn test_backoff_delay_for_attempt() {
        let policy = RetryPolicy {
            max_attempts: 10,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_factor: 2.0,
        };

        assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_secs(2));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_secs(4));
        assert_eq!(policy.delay_for_attempt(5), Duration::from_secs(16));
        // Should cap at max_delay
        assert_eq!(policy.delay_for_attempt(10), Duration::from_secs(30));
    }

    #[test]
    fn test_delay_for_attempt_zero() {
        let policy = RetryPolicy::fixed(2, Duration::from_millis(10));
        assert_eq!(policy.delay_for_attempt(0), policy.initial_delay);
    }

    #[test]
    fn test_huge_retry_number_caps() {
        let policy = RetryPolicy {
            max_attempts: usize::MAX,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff_factor: 2.0,
        };
        assert_eq!(policy.delay_for_attempt(5000), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_honours_delay() {
        let policy = RetryPolicy::fixed(2, Duration::from_secs(3));
        let start = tokio::time::Instant::now();
        policy.wait(1).await;
        assert!(start.elapsed() >= Duration::from_secs(3));
    }
}
