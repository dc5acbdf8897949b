//! Circuit breaker with a per-call deadline.
//!
//! ```text
//!   CLOSED ──(failures ≥ threshold)──► OPEN ──(reset window elapsed)──► HALF-OPEN
//!     ▲                                  ▲                                  │
//!     └──────────── success ─────────────┼──────────────────────────────────┤
//!                                        └──────────── failure ─────────────┘
//! ```
//!
//! The state is derived from the consecutive-failure count and the instant of
//! the last failure, both behind one mutex, so concurrent callers always see a
//! consistent transition. A timed-out operation is dropped locally; nothing is
//! cancelled on the remote side.

use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Breaker thresholds and the per-call deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerConfig {
    /// Consecutive failures that open the circuit.
    pub failure_threshold: u32,

    /// How long the circuit stays open after the last failure.
    pub reset_timeout: Duration,

    /// Deadline for each guarded operation.
    pub call_timeout: Duration,
}

impl BreakerConfig {
    pub const DEFAULT: Self = Self {
        failure_threshold: 3,
        reset_timeout: Duration::from_secs(60),
        call_timeout: Duration::from_secs(30),
    };
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerState {
    Closed,
    Open,
    /// The reset window has elapsed; the next call is a trial.
    HalfOpen,
}

/// Failure of a guarded operation.
#[derive(Debug, Error)]
pub enum ResilienceError<E> {
    /// The breaker refused the call without running it.
    #[error("circuit breaker is open; retry in {retry_after:?}")]
    CircuitOpen { retry_after: Duration },

    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// The operation ran and failed.
    #[error("{0}")]
    Failed(E),
}

/// Decides whether an operation error counts against the breaker.
///
/// Errors that prove the remote side is healthy (e.g. "not found") should
/// return false; they reset the failure count like a success.
pub trait TripsBreaker {
    fn trips_breaker(&self) -> bool;
}

#[derive(Debug)]
struct Inner {
    consecutive_failures: u32,
    last_failure_at: Option<Instant>,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    config: BreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner {
                consecutive_failures: 0,
                last_failure_at: None,
            }),
        }
    }

    pub fn config(&self) -> &BreakerConfig {
        &self.config
    }

    pub fn state(&self) -> BreakerState {
        let inner = self.lock();
        self.state_of(&inner, Instant::now())
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.lock().consecutive_failures
    }

    /// Closes the circuit and forgets all failures.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.consecutive_failures = 0;
        inner.last_failure_at = None;
    }

    /// Runs `operation` if the circuit allows it, racing it against the
    /// call deadline.
    pub async fn execute<T, E, F, Fut>(&self, operation: F) -> Result<T, ResilienceError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: TripsBreaker,
    {
        self.check_open()?;

        match tokio::time::timeout(self.config.call_timeout, operation()).await {
            Ok(Ok(value)) => {
                self.record_success();
                Ok(value)
            }
            Ok(Err(e)) => {
                if e.trips_breaker() {
                    self.record_failure();
                } else {
                    self.record_success();
                }
                Err(ResilienceError::Failed(e))
            }
            Err(_) => {
                warn!(timeout = ?self.config.call_timeout, "Guarded operation timed out");
                self.record_failure();
                Err(ResilienceError::Timeout(self.config.call_timeout))
            }
        }
    }

    fn check_open<E>(&self) -> Result<(), ResilienceError<E>> {
        let inner = self.lock();
        let now = Instant::now();
        match self.state_of(&inner, now) {
            BreakerState::Open => {
                let elapsed = inner
                    .last_failure_at
                    .map(|at| now.saturating_duration_since(at))
                    .unwrap_or_default();
                Err(ResilienceError::CircuitOpen {
                    retry_after: self.config.reset_timeout.saturating_sub(elapsed),
                })
            }
            BreakerState::HalfOpen => {
                debug!("Circuit half-open, allowing trial call");
                Ok(())
            }
            BreakerState::Closed => Ok(()),
        }
    }

    fn record_success(&self) {
        let mut inner = self.lock();
        inner.consecutive_failures = 0;
        inner.last_failure_at = None;
    }

    fn record_failure(&self) {
        let mut inner = self.lock();
        inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
        inner.last_failure_at = Some(Instant::now());
        if inner.consecutive_failures == self.config.failure_threshold {
            warn!(
                failures = inner.consecutive_failures,
                "Circuit breaker opened"
            );
        }
    }

    fn state_of(&self, inner: &Inner, now: Instant) -> BreakerState {
        if inner.consecutive_failures < self.config.failure_threshold {
            return BreakerState::Closed;
        }
        match inner.last_failure_at {
            Some(at) if now.saturating_duration_since(at) < self.config.reset_timeout => {
                BreakerState::Open
            }
            _ => BreakerState::HalfOpen,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // The guarded data is two plain counters; a panic elsewhere cannot
        // leave them inconsistent.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(BreakerConfig::DEFAULT)
    }
}
