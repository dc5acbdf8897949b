//! Gateway error types.
//!
//! Every host failure is sorted into one of four kinds. The kind decides how
//! the rest of the crate reacts:
//!
//! - **NotFound**: the PR or commit does not exist. Fatal for the root PR,
//!   skipped for nested ones. Does not count against the circuit breaker.
//! - **Unauthorized**: bad or missing credentials. Always fatal.
//! - **RateLimited**: the host is throttling us. Always fatal for the current
//!   call; a caller-level retry may try again later.
//! - **Transport**: network failures, 5xx and anything unrecognized.

use std::fmt;

use thiserror::Error;

use crate::resilience::TripsBreaker;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayErrorKind {
    NotFound,
    Unauthorized,
    RateLimited,
    Transport,
}

impl GatewayErrorKind {
    /// Returns true if repeating the same request later may succeed.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            GatewayErrorKind::RateLimited | GatewayErrorKind::Transport
        )
    }
}

impl fmt::Display for GatewayErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GatewayErrorKind::NotFound => "not found",
            GatewayErrorKind::Unauthorized => "unauthorized",
            GatewayErrorKind::RateLimited => "rate limited",
            GatewayErrorKind::Transport => "transport",
        })
    }
}

#[derive(Debug, Error)]
pub struct GatewayError {
    pub kind: GatewayErrorKind,

    /// The HTTP status code, if known.
    pub status_code: Option<u16>,

    pub message: String,

    #[source]
    pub source: Option<octocrab::Error>,
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status_code {
            Some(code) => write!(f, "{} (HTTP {}): {}", self.kind, code, self.message),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

impl GatewayError {
    pub fn new(kind: GatewayErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status_code: None,
            message: message.into(),
            source: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::NotFound, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Unauthorized, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::RateLimited, message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Transport, message)
    }

    /// Categorizes an octocrab error by status code, falling back to the
    /// message text when no status is available.
    pub fn from_octocrab(err: octocrab::Error) -> Self {
        let message = err.to_string();
        let status_code = extract_status_code(&message);
        let kind = classify(status_code, &message);
        Self {
            kind,
            status_code,
            message,
            source: Some(err),
        }
    }
}

impl TripsBreaker for GatewayError {
    fn trips_breaker(&self) -> bool {
        matches!(
            self.kind,
            GatewayErrorKind::RateLimited | GatewayErrorKind::Transport
        )
    }
}

fn classify(status_code: Option<u16>, message: &str) -> GatewayErrorKind {
    match status_code {
        Some(404) | Some(410) => GatewayErrorKind::NotFound,
        Some(401) => GatewayErrorKind::Unauthorized,
        Some(429) => GatewayErrorKind::RateLimited,
        Some(403) if is_rate_limit_message(message) => GatewayErrorKind::RateLimited,
        Some(403) => GatewayErrorKind::Unauthorized,
        Some(_) => GatewayErrorKind::Transport,
        None if is_rate_limit_message(message) => GatewayErrorKind::RateLimited,
        None if message.to_lowercase().contains("not found") => GatewayErrorKind::NotFound,
        None => GatewayErrorKind::Transport,
    }
}

/// Pulls an HTTP status out of an octocrab error message.
///
/// octocrab does not expose the status uniformly across its error variants,
/// so this matches the message text. A miss yields `None`, which classifies
/// as `Transport`.
fn extract_status_code(message: &str) -> Option<u16> {
    if let Some(idx) = message.find("status: ") {
        let digits: String = message[idx + 8..]
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        if let Ok(code) = digits.parse() {
            return Some(code);
        }
    }

    let lower = message.to_lowercase();
    if message.contains("404") && lower.contains("not found") {
        return Some(404);
    }
    [401, 403, 429, 500, 502, 503, 504]
        .into_iter()
        .find(|code| message.contains(&code.to_string()))
}

fn is_rate_limit_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("rate limit") || lower.contains("secondary rate") || lower.contains("abuse detection")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_to_kinds() {
        assert_eq!(classify(Some(404), ""), GatewayErrorKind::NotFound);
        assert_eq!(classify(Some(401), ""), GatewayErrorKind::Unauthorized);
        assert_eq!(classify(Some(403), "Resource not accessible"), GatewayErrorKind::Unauthorized);
        assert_eq!(classify(Some(403), "API rate limit exceeded"), GatewayErrorKind::RateLimited);
        assert_eq!(classify(Some(429), ""), GatewayErrorKind::RateLimited);
        assert_eq!(classify(Some(502), ""), GatewayErrorKind::Transport);
        assert_eq!(classify(Some(422), ""), GatewayErrorKind::Transport);
        assert_eq!(classify(None, "connection reset"), GatewayErrorKind::Transport);
    }

    #[test]
    fn status_extraction() {
        assert_eq!(extract_status_code("GitHub: status: 404 Not Found"), Some(404));
        assert_eq!(extract_status_code("error 404: Not Found"), Some(404));
        assert_eq!(extract_status_code("HTTP 503 Service Unavailable"), Some(503));
        assert_eq!(extract_status_code("dns failure"), None);
    }

    #[test]
    fn only_host_trouble_trips_the_breaker() {
        assert!(!GatewayError::not_found("x").trips_breaker());
        assert!(!GatewayError::unauthorized("x").trips_breaker());
        assert!(GatewayError::rate_limited("x").trips_breaker());
        assert!(GatewayError::transport("x").trips_breaker());
    }

    #[test]
    fn retriable_kinds() {
        assert!(GatewayErrorKind::Transport.is_retriable());
        assert!(GatewayErrorKind::RateLimited.is_retriable());
        assert!(!GatewayErrorKind::NotFound.is_retriable());
        assert!(!GatewayErrorKind::Unauthorized.is_retriable());
    }

    #[test]
    fn display_includes_status() {
        let mut err = GatewayError::not_found("PR #9");
        assert_eq!(err.to_string(), "not found: PR #9");
        err.status_code = Some(404);
        assert_eq!(err.to_string(), "not found (HTTP 404): PR #9");
    }
}
