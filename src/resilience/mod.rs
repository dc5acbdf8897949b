//! Protection around host calls.
//!
//! - `breaker`: a circuit breaker with a per-call deadline, shared by every
//!   fetch in the process.
//! - `retry`: exponential backoff for callers that want to repeat a whole
//!   analysis after a transient failure.

mod breaker;
mod retry;

pub use breaker::{BreakerConfig, BreakerState, CircuitBreaker, ResilienceError, TripsBreaker};
pub use retry::{Retriable, RetryConfig, RetryPolicy, RetryResult, retry_with_backoff};
