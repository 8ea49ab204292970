//! Tile fetch failure types.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::grid::TileSpec;
use crate::provider::ProviderError;

/// Why a single tile attempt failed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchFailure {
    /// Server error, connection reset or similar; worth retrying.
    #[error("transient failure: {0}")]
    Transient(String),

    /// The service asked us to slow down.
    #[error("rate limited (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    /// The attempt exceeded its time budget.
    #[error("attempt timed out after {0:?}")]
    Timeout(Duration),

    /// Client error other than rate limiting; retrying will not help.
    #[error("permanent failure: {0}")]
    Permanent(String),

    /// Response body is not a decodable image.
    #[error("could not decode tile: {0}")]
    Decode(String),

    /// The run was cancelled while this tile was in flight.
    #[error("cancelled")]
    Cancelled,
}

impl FetchFailure {
    /// True for failures the retry policy applies to.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FetchFailure::Transient(_) | FetchFailure::RateLimited { .. } | FetchFailure::Timeout(_)
        )
    }
}

impl From<ProviderError> for FetchFailure {
    fn from(err: ProviderError) -> Self {
        if err.is_rate_limited() {
            return FetchFailure::RateLimited {
                retry_after: err.retry_after(),
            };
        }
        match err {
            ProviderError::Status { status, .. } if status == 408 || status >= 500 => {
                FetchFailure::Transient(err.to_string())
            }
            ProviderError::Status { .. } => FetchFailure::Permanent(err.to_string()),
            ProviderError::Timeout(_)
            | ProviderError::Connection(_)
            | ProviderError::HttpError(_) => FetchFailure::Transient(err.to_string()),
        }
    }
}

/// A tile that could not be fetched, with the failure that ended it.
#[derive(Debug, Clone, PartialEq)]
pub struct TileFetchError {
    pub spec: TileSpec,
    pub cause: FetchFailure,
    pub attempts: u32,
}

impl fmt::Display for TileFetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} (after {} attempt{})",
            self.spec,
            self.cause,
            self.attempts,
            if self.attempts == 1 { "" } else { "s" }
        )
    }
}

impl std::error::Error for TileFetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(status: u16) -> ProviderError {
        ProviderError::Status {
            status,
            url: "https://host/t".to_string(),
            retry_after: None,
        }
    }

    #[test]
    fn test_classification() {
        assert!(matches!(
            FetchFailure::from(status(503)),
            FetchFailure::Transient(_)
        ));
        assert!(matches!(
            FetchFailure::from(status(408)),
            FetchFailure::Transient(_)
        ));
        assert!(matches!(
            FetchFailure::from(status(404)),
            FetchFailure::Permanent(_)
        ));
        assert!(matches!(
            FetchFailure::from(status(403)),
            FetchFailure::Permanent(_)
        ));
        assert!(matches!(
            FetchFailure::from(ProviderError::Connection("reset".to_string())),
            FetchFailure::Transient(_)
        ));
    }

    #[test]
    fn test_rate_limit_keeps_hint() {
        let err = ProviderError::Status {
            status: 429,
            url: String::new(),
            retry_after: Some(Duration::from_secs(7)),
        };
        assert_eq!(
            FetchFailure::from(err),
            FetchFailure::RateLimited {
                retry_after: Some(Duration::from_secs(7))
            }
        );
    }

    #[test]
    fn test_is_retryable() {
        assert!(FetchFailure::Transient(String::new()).is_retryable());
        assert!(FetchFailure::RateLimited { retry_after: None }.is_retryable());
        assert!(FetchFailure::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(!FetchFailure::Permanent(String::new()).is_retryable());
        assert!(!FetchFailure::Decode(String::new()).is_retryable());
        assert!(!FetchFailure::Cancelled.is_retryable());
    }

    #[test]
    fn test_tile_fetch_error_display() {
        let err = TileFetchError {
            spec: TileSpec {
                index: 4,
                row: 1,
                col: 1,
                x: 10,
                y: 10,
                width: 10,
                height: 10,
                request_url: String::new(),
            },
            cause: FetchFailure::Permanent("HTTP 404 from u".to_string()),
            attempts: 1,
        };
        assert_eq!(
            err.to_string(),
            "tile #4 (row 1, col 1) 10x10 at (10, 10): permanent failure: HTTP 404 from u (after 1 attempt)"
        );
    }
}
