//! Error types for metadata resolution.

use thiserror::Error;

use crate::provider::ProviderError;

/// Errors that can occur while resolving a reference into an image source.
#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    /// Identifier or dimensions could not be located.
    #[error("Could not resolve image from '{reference}': {reason}")]
    Resolution { reference: String, reason: String },

    /// The service does not offer the supported raster type.
    #[error("Unsupported image format for '{reference}': service offers [{offered}]")]
    UnsupportedFormat { reference: String, offered: String },

    /// Fetching the page or metadata document failed.
    #[error("Failed to fetch metadata: {0}")]
    Http(#[from] ProviderError),
}

impl ResolveError {
    pub(crate) fn resolution(reference: &str, reason: impl Into<String>) -> Self {
        ResolveError::Resolution {
            reference: reference.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_display() {
        let err = ResolveError::resolution("https://x", "no gallery button");
        assert_eq!(
            err.to_string(),
            "Could not resolve image from 'https://x': no gallery button"
        );
    }

    #[test]
    fn test_from_provider_error() {
        let err: ResolveError = ProviderError::Timeout("slow".to_string()).into();
        assert!(matches!(err, ResolveError::Http(_)));
    }
}
