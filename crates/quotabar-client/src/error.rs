//! Error taxonomy for quota fetches
//!
//! Every failure the client can observe (HTTP status, transport failure,
//! malformed payload) is classified once, where it happens, into an
//! [`ErrorKind`]. The kind fixes whether the failure is retryable.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Maximum number of response body characters kept as an error cause.
const MAX_CAUSE_CHARS: usize = 200;

/// Failure classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Connection reset, refused, timed out or host not found
    Network,
    /// HTTP 401
    Auth,
    /// HTTP 403
    Forbidden,
    /// HTTP 404
    NotFound,
    /// HTTP 429
    RateLimit,
    /// HTTP 5xx
    Server,
    /// Request exceeded the configured timeout
    Timeout,
    /// Response body could not be parsed or was missing required fields
    Validation,
    /// Anything else
    Unknown,
}

impl ErrorKind {
    /// Whether a failure of this kind may succeed on a later attempt.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::Network | Self::RateLimit | Self::Server | Self::Timeout
        )
    }

    /// Stable snake_case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Auth => "auth",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not_found",
            Self::RateLimit => "rate_limit",
            Self::Server => "server",
            Self::Timeout => "timeout",
            Self::Validation => "validation",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transport-level failure code reported by the HTTP stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportCode {
    /// Peer reset the connection
    ConnectionReset,
    /// Socket-level timeout (ETIMEDOUT)
    TimedOut,
    /// DNS lookup failed
    HostNotFound,
    /// Nothing listening on the remote side
    ConnectionRefused,
    /// The request-level timeout elapsed
    Timeout,
    /// Unrecognized transport failure
    Other,
}

/// Classify an HTTP status code.
#[must_use]
pub fn classify_status(status: u16) -> ErrorKind {
    match status {
        401 => ErrorKind::Auth,
        403 => ErrorKind::Forbidden,
        404 => ErrorKind::NotFound,
        429 => ErrorKind::RateLimit,
        s if s >= 500 => ErrorKind::Server,
        _ => ErrorKind::Unknown,
    }
}

/// Classify a transport failure code.
#[must_use]
pub fn classify_transport(code: TransportCode) -> ErrorKind {
    match code {
        TransportCode::ConnectionReset
        | TransportCode::TimedOut
        | TransportCode::HostNotFound
        | TransportCode::ConnectionRefused => ErrorKind::Network,
        TransportCode::Timeout => ErrorKind::Timeout,
        TransportCode::Other => ErrorKind::Unknown,
    }
}

/// A classified fetch failure.
///
/// Built once at the point of failure and never mutated afterwards; the
/// retry flag is derived from the kind at construction time.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind} error: {message}")]
pub struct FetchError {
    kind: ErrorKind,
    status: Option<u16>,
    retryable: bool,
    message: String,
    cause: Option<String>,
}

impl FetchError {
    /// Create an error of the given kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            retryable: kind.is_retryable(),
            message: message.into(),
            cause: None,
        }
    }

    /// Malformed or incomplete payload.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Non-success HTTP response. The body, if any, is kept as the cause.
    #[must_use]
    pub fn from_status(status: u16, body: &str) -> Self {
        let kind = classify_status(status);
        let message = match kind {
            ErrorKind::Auth => "authentication failed".to_string(),
            ErrorKind::Forbidden => "access to quota data forbidden".to_string(),
            ErrorKind::NotFound => "quota endpoint not found".to_string(),
            ErrorKind::RateLimit => "rate limited by quota endpoint".to_string(),
            ErrorKind::Server => "quota endpoint server error".to_string(),
            _ => "unexpected response from quota endpoint".to_string(),
        };
        let mut err = Self::new(kind, format!("{} (HTTP {})", message, status));
        err.status = Some(status);
        let body = body.trim();
        if !body.is_empty() {
            err.cause = Some(body.chars().take(MAX_CAUSE_CHARS).collect());
        }
        err
    }

    /// Transport failure.
    pub fn from_transport(code: TransportCode, message: impl Into<String>) -> Self {
        Self::new(classify_transport(code), message)
    }

    /// Attach the underlying cause.
    #[must_use]
    pub fn with_cause(mut self, cause: impl fmt::Display) -> Self {
        self.cause = Some(cause.to_string());
        self
    }

    /// Failure classification.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// HTTP status, when the failure came from a response.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// Whether the client may retry after this failure.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.retryable
    }

    /// Human-readable summary.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Underlying cause, if recorded.
    #[must_use]
    pub fn cause(&self) -> Option<&str> {
        self.cause.as_deref()
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, FetchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(classify_status(401), ErrorKind::Auth);
        assert_eq!(classify_status(403), ErrorKind::Forbidden);
        assert_eq!(classify_status(404), ErrorKind::NotFound);
        assert_eq!(classify_status(429), ErrorKind::RateLimit);
        assert_eq!(classify_status(500), ErrorKind::Server);
        assert_eq!(classify_status(503), ErrorKind::Server);
        assert_eq!(classify_status(418), ErrorKind::Unknown);
        assert_eq!(classify_status(302), ErrorKind::Unknown);
    }

    #[test]
    fn test_transport_classification() {
        assert_eq!(
            classify_transport(TransportCode::ConnectionReset),
            ErrorKind::Network
        );
        assert_eq!(classify_transport(TransportCode::TimedOut), ErrorKind::Network);
        assert_eq!(
            classify_transport(TransportCode::HostNotFound),
            ErrorKind::Network
        );
        assert_eq!(
            classify_transport(TransportCode::ConnectionRefused),
            ErrorKind::Network
        );
        assert_eq!(classify_transport(TransportCode::Timeout), ErrorKind::Timeout);
        assert_eq!(classify_transport(TransportCode::Other), ErrorKind::Unknown);
    }

    #[test]
    fn test_only_transient_kinds_are_retryable() {
        let retryable: Vec<ErrorKind> = [
            ErrorKind::Network,
            ErrorKind::Auth,
            ErrorKind::Forbidden,
            ErrorKind::NotFound,
            ErrorKind::RateLimit,
            ErrorKind::Server,
            ErrorKind::Timeout,
            ErrorKind::Validation,
            ErrorKind::Unknown,
        ]
        .into_iter()
        .filter(|k| k.is_retryable())
        .collect();

        assert_eq!(
            retryable,
            vec![
                ErrorKind::Network,
                ErrorKind::RateLimit,
                ErrorKind::Server,
                ErrorKind::Timeout
            ]
        );
    }

    #[test]
    fn test_from_status_keeps_status_and_body() {
        let err = FetchError::from_status(401, r#"{"message":"Bad credentials"}"#);
        assert_eq!(err.kind(), ErrorKind::Auth);
        assert_eq!(err.status(), Some(401));
        assert!(!err.is_retryable());
        assert!(err.message().contains("401"));
        assert_eq!(err.cause(), Some(r#"{"message":"Bad credentials"}"#));
    }

    #[test]
    fn test_from_status_truncates_long_body() {
        let body = "x".repeat(1_000);
        let err = FetchError::from_status(502, &body);
        assert!(err.is_retryable());
        assert_eq!(err.cause().map(str::len), Some(MAX_CAUSE_CHARS));
    }

    #[test]
    fn test_display_includes_kind() {
        let err = FetchError::validation("missing quota data");
        assert_eq!(err.to_string(), "validation error: missing quota data");
        assert_eq!(ErrorKind::NotFound.to_string(), "not_found");
    }
}
