//! Retry policy for transient backend failures.
//!
//! Delays follow a capped, jittered exponential backoff built from
//! `tokio-retry` strategies. Only failures classified as transient by
//! [`SearchIndexError::is_transient`](crate::errors::SearchIndexError::is_transient)
//! consume retry budget; everything else fails immediately.

use std::time::Duration;

use tokio_retry::strategy::{jitter, ExponentialBackoff};

/// Backoff configuration for retried backend calls.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first.
    pub max_attempts: usize,
    /// Base delay before the first retry.
    pub base_delay: Duration,
    /// Cap applied to the exponential growth.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Create a policy with the given attempt limit and base delay.
    pub fn new(max_attempts: usize, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay,
        }
    }

    /// A policy that never retries.
    pub fn no_retries() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// The jittered delay sequence for the retries this policy allows.
    ///
    /// Yields `max_attempts - 1` delays: one per retry after the initial
    /// attempt.
    pub fn delays(&self) -> impl Iterator<Item = Duration> {
        ExponentialBackoff::from_millis(self.base_delay.as_millis().max(1) as u64)
            .factor(2)
            .max_delay(self.max_delay)
            .map(jitter)
            .take(self.max_attempts.saturating_sub(1))
    }
}
