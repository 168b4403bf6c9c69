//! Error types for the execution client

use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when talking to the execution backend
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed (connection refused, timeout, TLS, ...)
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// API returned an error status code
    #[error("API error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    ParseError(String),
}

impl ClientError {
    /// Create an API error from status code and message
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            status,
            message: message.into(),
        }
    }

    /// The backend already holds a job with this idempotency key
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::ApiError { status: 409, .. })
    }

    /// Check if this error is a client error (4xx status)
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::ApiError { status, .. } if *status >= 400 && *status < 500)
    }

    /// Check if this error is a server error (5xx status)
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::ApiError { status, .. } if *status >= 500)
    }

    /// Whether retrying the same request later may succeed
    ///
    /// Transport failures, timeouts (408), throttling (429) and server errors
    /// are transient. A success status with an unreadable body is treated the
    /// same way: the submission is idempotent, so sending it again is safe.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RequestFailed(_) | Self::ParseError(_) => true,
            Self::ApiError { status, .. } => matches!(*status, 408 | 429) || *status >= 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_errors_are_transient() {
        assert!(ClientError::api_error(500, "boom").is_transient());
        assert!(ClientError::api_error(503, "overloaded").is_transient());
        assert!(ClientError::api_error(503, "overloaded").is_server_error());
    }

    #[test]
    fn test_throttling_and_timeouts_are_transient() {
        assert!(ClientError::api_error(429, "slow down").is_transient());
        assert!(ClientError::api_error(408, "timeout").is_transient());
    }

    #[test]
    fn test_rejections_are_permanent() {
        let err = ClientError::api_error(422, "unknown job kind");
        assert!(!err.is_transient());
        assert!(err.is_client_error());
        assert!(!err.is_duplicate());
    }

    #[test]
    fn test_conflict_is_duplicate() {
        let err = ClientError::api_error(409, "already enqueued");
        assert!(err.is_duplicate());
        assert!(!err.is_transient());
    }

    #[test]
    fn test_parse_error_is_transient() {
        assert!(ClientError::ParseError("eof".to_string()).is_transient());
    }
}
