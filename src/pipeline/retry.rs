//! Retry policy for transient fetch failures
//!
//! The policy only decides how many attempts to make and how long to wait
//! between them. What an attempt does (and whether it holds a concurrency
//! permit) is up to the caller.

use crate::config::{BackoffKind, RetryConfig};
use crate::FetchError;
use std::future::Future;
use std::time::Duration;

/// Delay shape between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay before every retry
    Fixed(Duration),

    /// `base * 2^(n-1)` before retry n, capped at `max`
    Exponential { base: Duration, max: Duration },
}

/// How many attempts a request gets, and the wait between them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Backoff,
}

/// Result of running an operation under a retry policy
#[derive(Debug)]
pub struct Retried<T> {
    pub result: Result<T, FetchError>,

    /// Attempts made, including the first one
    pub attempts: u32,
}

impl<T> Retried<T> {
    /// Attempts beyond the first
    pub fn retries(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }
}

impl RetryPolicy {
    /// Creates a policy; `max_attempts` below 1 is treated as 1
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        let base = Duration::from_millis(config.base_delay_ms);
        let backoff = match config.backoff {
            BackoffKind::Fixed => Backoff::Fixed(base),
            BackoffKind::Exponential => Backoff::Exponential {
                base,
                max: Duration::from_millis(config.max_delay_ms),
            },
        };
        Self::new(config.max_attempts, backoff)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Wait after failed attempt number `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed(delay) => delay,
            Backoff::Exponential { base, max } => {
                let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
                base.saturating_mul(factor).min(max)
            }
        }
    }

    /// Returns true if another attempt should follow this failure
    pub fn should_retry(&self, error: &FetchError, attempt: u32) -> bool {
        error.is_retryable() && attempt < self.max_attempts
    }

    /// Runs `op` until it succeeds, fails terminally or runs out of attempts
    ///
    /// `op` receives the 1-based attempt number.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Retried<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => {
                    return Retried {
                        result: Ok(value),
                        attempts: attempt,
                    }
                }
                Err(error) if self.should_retry(&error, attempt) => {
                    let delay = self.delay_for(attempt);
                    tracing::debug!(
                        "Attempt {}/{} failed ({}), retrying in {:?}",
                        attempt,
                        self.max_attempts,
                        error,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => {
                    return Retried {
                        result: Err(error),
                        attempts: attempt,
                    }
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}
