//! Error types for quotabar-core
//!
//! This module provides error types and user-facing guidance for both core
//! errors and fetch failures.

use quotabar_client::{ErrorKind, FetchError};
use thiserror::Error;

/// Core error type
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Usage data failed validation
    #[error("invalid usage data: {0}")]
    Validation(String),

    /// Invalid configuration value
    #[error("invalid configuration: {field}: {message}")]
    InvalidConfig {
        /// Config field name
        field: String,
        /// Detailed message
        message: String,
    },

    /// Quota fetch failed
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Trait for user-friendly error messages
pub trait UserFriendlyError {
    /// Short message suitable for a tooltip or status line
    fn user_message(&self) -> String;

    /// What the user can do about it
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for FetchError {
    fn user_message(&self) -> String {
        match self.kind() {
            ErrorKind::Network => "Network connection problem.".to_string(),
            ErrorKind::Auth => "Your session has expired.".to_string(),
            ErrorKind::Forbidden => "Access to premium request data was denied.".to_string(),
            ErrorKind::NotFound => "No premium request quota found for this account.".to_string(),
            ErrorKind::RateLimit => "Rate limited by the quota service.".to_string(),
            ErrorKind::Server => match self.status() {
                Some(status) => format!("Quota service error (HTTP {}).", status),
                None => "Quota service error.".to_string(),
            },
            ErrorKind::Timeout => "Quota request timed out.".to_string(),
            ErrorKind::Validation => format!("Unexpected quota data: {}.", self.message()),
            ErrorKind::Unknown => format!("Unexpected error: {}.", self.message()),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self.kind() {
            ErrorKind::Auth => Some(
                "Sign in again with `gh auth login` or set GITHUB_TOKEN.".to_string(),
            ),
            ErrorKind::Forbidden | ErrorKind::NotFound => {
                Some("Check that your account has an active Copilot subscription.".to_string())
            }
            ErrorKind::Network | ErrorKind::Timeout => {
                Some("Check your internet connection; quotabar will retry.".to_string())
            }
            ErrorKind::RateLimit | ErrorKind::Server => {
                Some("quotabar will retry on the next refresh.".to_string())
            }
            ErrorKind::Validation | ErrorKind::Unknown => None,
        }
    }
}

impl UserFriendlyError for Error {
    fn user_message(&self) -> String {
        match self {
            Error::Validation(msg) => format!("Invalid usage data: {}.", msg),
            Error::InvalidConfig { field, message } => {
                format!("Configuration error in '{}': {}", field, message)
            }
            Error::Fetch(e) => e.user_message(),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            Error::Validation(_) => None,
            Error::InvalidConfig { field, .. } => Some(format!(
                "Check the '{}' setting in your quotabar config or QUOTABAR_ environment.",
                field
            )),
            Error::Fetch(e) => e.suggestion(),
        }
    }
}

/// Message plus suggestion, on separate lines.
pub fn format_error_for_display(error: &dyn UserFriendlyError) -> String {
    let mut output = error.user_message();
    if let Some(suggestion) = error.suggestion() {
        output.push('\n');
        output.push_str(&suggestion);
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_guidance() {
        let err = FetchError::from_status(401, "");
        assert!(err.user_message().contains("expired"));
        assert!(err.suggestion().unwrap().contains("gh auth login"));
    }

    #[test]
    fn test_forbidden_points_at_subscription() {
        let err = FetchError::from_status(403, "");
        assert!(err.suggestion().unwrap().contains("subscription"));
    }

    #[test]
    fn test_server_message_includes_status() {
        let err = FetchError::from_status(502, "");
        assert!(err.user_message().contains("502"));
    }

    #[test]
    fn test_core_error_delegates_to_fetch() {
        let err: Error = FetchError::from_status(429, "").into();
        assert!(err.user_message().contains("Rate limited"));
        assert!(err.suggestion().is_some());
    }

    #[test]
    fn test_format_error_for_display() {
        let err = Error::InvalidConfig {
            field: "warning_threshold".to_string(),
            message: "must be between 0 and 100".to_string(),
        };
        let output = format_error_for_display(&err);
        assert!(output.contains("warning_threshold"));
        assert!(output.contains("QUOTABAR_"));
        assert_eq!(output.lines().count(), 2);
    }

    #[test]
    fn test_validation_has_no_suggestion() {
        let err = Error::Validation("included_total must be positive".to_string());
        assert_eq!(
            format_error_for_display(&err),
            "Invalid usage data: included_total must be positive."
        );
    }
}
