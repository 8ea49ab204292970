//! Provider error types

use std::fmt;
use std::time::Duration;

/// Errors that can occur while talking to an image service.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// Server answered with a non-success status code.
    Status {
        status: u16,
        url: String,
        /// Parsed `Retry-After` header, if the server sent one.
        retry_after: Option<Duration>,
    },
    /// Request did not complete within the client timeout.
    Timeout(String),
    /// Connection could not be established or was reset mid-transfer.
    Connection(String),
    /// Any other HTTP-level failure.
    HttpError(String),
}

impl ProviderError {
    /// Returns true if the status is the rate-limit status (429).
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ProviderError::Status { status: 429, .. })
    }

    /// Returns the server's retry hint, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ProviderError::Status { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::Status { status, url, .. } => write!(f, "HTTP {} from {}", status, url),
            ProviderError::Timeout(msg) => write!(f, "Request timed out: {}", msg),
            ProviderError::Connection(msg) => write!(f, "Connection failed: {}", msg),
            ProviderError::HttpError(msg) => write!(f, "HTTP error: {}", msg),
        }
    }
}

impl std::error::Error for ProviderError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display() {
        let err = ProviderError::Status {
            status: 503,
            url: "https://example.com/a".to_string(),
            retry_after: None,
        };
        assert_eq!(err.to_string(), "HTTP 503 from https://example.com/a");
    }

    #[test]
    fn test_rate_limited() {
        let err = ProviderError::Status {
            status: 429,
            url: String::new(),
            retry_after: Some(Duration::from_secs(5)),
        };
        assert!(err.is_rate_limited());
        assert_eq!(err.retry_after(), Some(Duration::from_secs(5)));

        let err = ProviderError::Timeout("slow".to_string());
        assert!(!err.is_rate_limited());
        assert_eq!(err.retry_after(), None);
    }
}
