//! Retry and backoff policy for failed posting attempts.

use chrono::Duration;
use publishers::PublishError;

/// What to do with an item after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Put the item back to pending, due after `delay`.
    Retry { delay: Duration },
    /// Mark the item failed.
    GiveUp,
}

/// Exponential backoff: the N-th failure waits `base_delay * 2^(N-1)`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Failures that are still retried. The one after that is final.
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::minutes(5),
        }
    }
}

impl RetryPolicy {
    /// Decide after the item's `attempts`-th failed attempt.
    pub fn decide(&self, attempts: u32) -> RetryDecision {
        if attempts == 0 || attempts > self.max_retries {
            return RetryDecision::GiveUp;
        }
        let factor = 2i32.saturating_pow(attempts - 1);
        RetryDecision::Retry { delay: self.base_delay * factor }
    }

    /// Like [`decide`](Self::decide), but fatal errors are never retried.
    pub fn decide_for(&self, error: &PublishError, attempts: u32) -> RetryDecision {
        if error.is_retryable() {
            self.decide(attempts)
        } else {
            RetryDecision::GiveUp
        }
    }
}
