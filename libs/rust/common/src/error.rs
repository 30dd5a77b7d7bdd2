//! Centralized error type for platform infrastructure concerns.
//!
//! All errors are classified as either retryable or non-retryable, which
//! helps callers decide whether to retry failed operations.

use thiserror::Error;

/// Common error type for platform operations.
#[derive(Error, Debug)]
pub enum PlatformError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Service is temporarily unavailable
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Timeout occurred
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlatformError {
    /// Check if this error is retryable.
    ///
    /// Retryable errors are transient failures that may succeed on retry,
    /// such as network issues or temporary unavailability.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout(_))
    }

    /// Create an unavailable error with the given message.
    #[must_use]
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Create an invalid input error with the given message.
    #[must_use]
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a not-found error with the given message.
    #[must_use]
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(PlatformError::Unavailable("test".to_string()).is_retryable());
        assert!(PlatformError::Timeout("test".to_string()).is_retryable());
    }

    #[test]
    fn test_non_retryable_errors() {
        assert!(!PlatformError::NotFound("test".to_string()).is_retryable());
        assert!(!PlatformError::InvalidInput("test".to_string()).is_retryable());
        assert!(!PlatformError::Internal("test".to_string()).is_retryable());
    }
}
