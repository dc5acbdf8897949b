//! Errors surfaced by a lineage analysis.

use std::time::Duration;

use thiserror::Error;

use crate::gateway::{GatewayError, GatewayErrorKind};
use crate::resilience::{ResilienceError, Retriable};

/// The kind of a `LineageError`, for callers that branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Unauthorized,
    RateLimited,
    Transport,
    Timeout,
    CircuitOpen,
}

impl ErrorKind {
    /// Returns true if the whole analysis may succeed when run again later.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            ErrorKind::RateLimited
                | ErrorKind::Transport
                | ErrorKind::Timeout
                | ErrorKind::CircuitOpen
        )
    }

    /// Returns true if the analysis must stop even when the failing fetch
    /// was for a nested PR or for optional evidence.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ErrorKind::Unauthorized | ErrorKind::RateLimited)
    }
}

#[derive(Debug, Error)]
pub enum LineageError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("host call timed out after {0:?}")]
    Timeout(Duration),

    #[error("circuit breaker is open; retry in {retry_after:?}")]
    CircuitOpen { retry_after: Duration },
}

impl LineageError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LineageError::Gateway(e) => match e.kind {
                GatewayErrorKind::NotFound => ErrorKind::NotFound,
                GatewayErrorKind::Unauthorized => ErrorKind::Unauthorized,
                GatewayErrorKind::RateLimited => ErrorKind::RateLimited,
                GatewayErrorKind::Transport => ErrorKind::Transport,
            },
            LineageError::Timeout(_) => ErrorKind::Timeout,
            LineageError::CircuitOpen { .. } => ErrorKind::CircuitOpen,
        }
    }
}

impl From<ResilienceError<GatewayError>> for LineageError {
    fn from(err: ResilienceError<GatewayError>) -> Self {
        match err {
            ResilienceError::CircuitOpen { retry_after } => LineageError::CircuitOpen { retry_after },
            ResilienceError::Timeout(after) => LineageError::Timeout(after),
            ResilienceError::Failed(e) => LineageError::Gateway(e),
        }
    }
}

impl Retriable for LineageError {
    fn is_retriable(&self) -> bool {
        self.kind().is_retriable()
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            LineageError::CircuitOpen { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_gateway_kinds() {
        let err = LineageError::from(GatewayError::not_found("PR #1"));
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(!err.is_retriable());

        let err = LineageError::from(ResilienceError::Failed(GatewayError::rate_limited("slow down")));
        assert_eq!(err.kind(), ErrorKind::RateLimited);
        assert!(err.kind().is_fatal());
        assert!(err.is_retriable());
    }

    #[test]
    fn breaker_errors_convert() {
        let err = LineageError::from(ResilienceError::<GatewayError>::CircuitOpen {
            retry_after: Duration::from_secs(12),
        });
        assert_eq!(err.kind(), ErrorKind::CircuitOpen);
        assert_eq!(err.retry_after(), Some(Duration::from_secs(12)));

        let err = LineageError::from(ResilienceError::<GatewayError>::Timeout(Duration::from_secs(30)));
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(!err.kind().is_fatal());
    }
}
