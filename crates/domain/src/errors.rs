//! Error types used throughout the application

use std::time::Duration;

use thiserror::Error;

/// Main error type for PriceSync remote-call and sync operations
///
/// The variants mirror the layers a remote call can fail in: transport,
/// HTTP status, body decoding, provider-level validation, and the
/// resilience substrate (circuit breaker, timeout, cancellation).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyncError {
    /// Connection-level failure before any response was received
    #[error("transport error: {0}")]
    Transport(String),

    /// The provider answered with a non-2xx status code
    #[error("provider returned status {code}")]
    Status {
        /// HTTP status code as received
        code: u16,
        /// Response body, preserved verbatim for diagnostics
        body: String,
    },

    /// The response body did not match the expected shape
    #[error("decode error: {0}")]
    Decode(String),

    /// Well-formed response with semantically unexpected content
    #[error("provider validation failed: {0}")]
    Validation(String),

    /// The circuit breaker short-circuited the call
    #[error("circuit breaker open")]
    CircuitOpen,

    /// A caller-side deadline expired
    #[error("operation timed out after {elapsed:?}")]
    Timeout { elapsed: Duration },

    /// The caller cancelled the operation
    #[error("operation cancelled")]
    Cancelled,

    /// Invalid configuration or client construction failure
    #[error("configuration error: {0}")]
    Config(String),
}

impl SyncError {
    /// Whether a retrying transport may re-send after this error.
    ///
    /// Only connection-level failures and 5xx statuses are retryable;
    /// decode and validation failures are deterministic, and breaker /
    /// cancellation errors must propagate immediately.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status { code, .. } => *code >= 500,
            Self::Decode(_)
            | Self::Validation(_)
            | Self::CircuitOpen
            | Self::Timeout { .. }
            | Self::Cancelled
            | Self::Config(_) => false,
        }
    }
}

/// Result type alias for PriceSync operations
pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_and_server_status_are_retryable() {
        assert!(SyncError::Transport("connection refused".into()).is_retryable());
        assert!(SyncError::Status { code: 500, body: String::new() }.is_retryable());
        assert!(SyncError::Status { code: 503, body: String::new() }.is_retryable());
    }

    #[test]
    fn client_status_and_domain_errors_are_not_retryable() {
        assert!(!SyncError::Status { code: 404, body: String::new() }.is_retryable());
        assert!(!SyncError::Status { code: 400, body: String::new() }.is_retryable());
        assert!(!SyncError::Decode("bad json".into()).is_retryable());
        assert!(!SyncError::Validation("bad status".into()).is_retryable());
        assert!(!SyncError::CircuitOpen.is_retryable());
        assert!(!SyncError::Cancelled.is_retryable());
    }

    #[test]
    fn status_display_preserves_code() {
        let err = SyncError::Status { code: 502, body: "upstream".into() };
        assert!(err.to_string().contains("502"));
    }
}
