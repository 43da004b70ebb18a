use std::time::Duration;

use crate::errors::Retryable;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_DELAY_SECS: u64 = 5;

/// Bounded, fixed-delay retry policy applied to each I/O step of a run.
///
/// `max_attempts` counts the first try, so the default of 3 allows two
/// retries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: DEFAULT_MAX_ATTEMPTS, delay: Duration::from_secs(DEFAULT_DELAY_SECS) }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self { max_attempts: max_attempts.max(1), delay }
    }

    /// Whether another attempt should follow a failure on `attempt` (1-based).
    pub fn should_retry<E>(&self, error: &E, attempt: u32) -> bool
    where
        E: Retryable,
    {
        error.is_transient() && attempt < self.max_attempts
    }

    pub fn delay_before(&self, _next_attempt: u32) -> Duration {
        self.delay
    }
}
