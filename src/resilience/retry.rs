//! Exponential backoff for whole-analysis retries.
//!
//! The engine itself never retries a host call: a failed nested fetch is
//! recorded and skipped. Callers that want another attempt at a transient
//! failure wrap `LineageEngine::analyze` in `retry_with_backoff`.
//!
//! - Default: 3 retries with 2s, 4s, 8s delays
//! - A breaker's `retry_after` hint stretches the delay so the next attempt
//!   lands after the circuit can half-open.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// An error that knows whether repeating the operation may help.
pub trait Retriable {
    fn is_retriable(&self) -> bool;

    /// A minimum wait suggested by the error itself.
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    /// Retry attempts, not counting the initial attempt.
    pub max_retries: u32,

    pub initial_delay: Duration,

    /// Cap for exponential growth. Does not cap `retry_after` hints.
    pub max_delay: Duration,

    pub backoff_multiplier: f64,
}

impl RetryConfig {
    pub const DEFAULT: Self = Self {
        max_retries: 3,
        initial_delay: Duration::from_secs(2),
        max_delay: Duration::from_secs(16),
        backoff_multiplier: 2.0,
    };

    pub fn new(
        max_retries: u32,
        initial_delay: Duration,
        max_delay: Duration,
        backoff_multiplier: f64,
    ) -> Self {
        Self {
            max_retries,
            initial_delay,
            max_delay,
            backoff_multiplier,
        }
    }

    /// Delay before retry number `attempt` (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let multiplier = self.backoff_multiplier.powi(attempt as i32);
        let delay_secs = self.initial_delay.as_secs_f64() * multiplier;
        Duration::from_secs_f64(delay_secs.min(self.max_delay.as_secs_f64()))
    }

    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        (0..self.max_retries).map(|attempt| self.delay_for_attempt(attempt))
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RetryPolicy {
    #[default]
    RetryTransient,
    NoRetry,
}

#[derive(Debug)]
pub enum RetryResult<T, E> {
    Success(T),

    /// A retriable error persisted through every attempt.
    ExhaustedRetries { last_error: E, attempts: u32 },

    /// A non-retriable error; returned on first sight.
    Permanent(E),
}

impl<T, E> RetryResult<T, E> {
    pub fn into_result(self) -> Result<T, E> {
        match self {
            RetryResult::Success(v) => Ok(v),
            RetryResult::ExhaustedRetries { last_error, .. } => Err(last_error),
            RetryResult::Permanent(e) => Err(e),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RetryResult::Success(_))
    }
}

/// Runs `operation` until it succeeds, fails permanently, or runs out of
/// attempts.
pub async fn retry_with_backoff<T, E, F, Fut>(
    config: RetryConfig,
    policy: RetryPolicy,
    mut operation: F,
) -> RetryResult<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retriable + std::fmt::Display,
{
    let max_attempts = match policy {
        RetryPolicy::NoRetry => 1,
        RetryPolicy::RetryTransient => config.max_retries + 1,
    };
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(value) => return RetryResult::Success(value),
            Err(e) => {
                attempt += 1;
                if !e.is_retriable() {
                    return RetryResult::Permanent(e);
                }
                if attempt >= max_attempts {
                    return RetryResult::ExhaustedRetries {
                        last_error: e,
                        attempts: attempt,
                    };
                }

                let backoff = config.delay_for_attempt(attempt - 1);
                let delay = e.retry_after().map_or(backoff, |hint| hint.max(backoff));
                warn!(attempt, delay = ?delay, error = %e, "Retrying after transient failure");
                tokio::time::sleep(delay).await;
            }
        }
    }
}
