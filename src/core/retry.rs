//! Bounded retry of operations that lost an optimistic-concurrency race
//!
//! Only [`LedgerError::Conflict`] is retried. Business-rule failures return
//! immediately. Each retry re-runs the whole read-validate-commit cycle, so the
//! operation always decides on fresh state.

use crate::types::LedgerError;
use std::time::Duration;
use tracing::debug;

/// Retry settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Delay before the second attempt; doubled for each further attempt
    pub base_delay: Duration,
    /// Upper bound for a single delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(64),
        }
    }
}

impl RetryPolicy {
    /// Create a policy, falling back to the default for a zero attempt count
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        let default = Self::default();
        let max_attempts = if max_attempts == 0 {
            tracing::warn!(
                "Invalid max_attempts ({}), using default ({})",
                max_attempts,
                default.max_attempts
            );
            default.max_attempts
        } else {
            max_attempts
        };

        Self {
            max_attempts,
            base_delay,
            max_delay: max_delay.max(base_delay),
        }
    }

    /// Delay to wait after the given failed attempt (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Run `op` until it succeeds, fails for a non-conflict reason, or attempts run out
    ///
    /// # Arguments
    ///
    /// * `operation` - Name used in logs and in the exhaustion error
    /// * `op` - The full operation, re-executed on every attempt
    ///
    /// # Errors
    ///
    /// - Any non-retryable error from `op`, unchanged
    /// - `RetriesExhausted` once `max_attempts` attempts all conflicted
    pub fn run<T, F>(&self, operation: &str, mut op: F) -> Result<T, LedgerError>
    where
        F: FnMut() -> Result<T, LedgerError>,
    {
        let mut attempt = 1;
        loop {
            match op() {
                Err(error) if error.is_retryable() => {
                    if attempt >= self.max_attempts {
                        return Err(LedgerError::retries_exhausted(operation, attempt));
                    }
                    let delay = self.backoff(attempt);
                    debug!(operation, attempt, ?delay, %error, "retrying after conflict");
                    std::thread::sleep(delay);
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}
