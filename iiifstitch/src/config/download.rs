//! Runtime configuration for a reconstruction run.

use std::time::Duration;

use super::defaults::*;
use crate::fetch::RetryPolicy;
use crate::grid::RequestTemplate;

/// Settings controlling how tiles are fetched and the output is produced.
///
/// # Example
///
/// ```
/// use iiifstitch::config::DownloadConfig;
/// use std::time::Duration;
///
/// let config = DownloadConfig::default()
///     .with_workers(16)
///     .with_max_attempts(5)
///     .with_attempt_timeout(Duration::from_secs(10))
///     .with_max_dimension(Some(8000));
///
/// assert_eq!(config.workers(), 16);
/// assert_eq!(config.retry().max_attempts(), 5);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct DownloadConfig {
    workers: usize,
    retry: RetryPolicy,
    attempt_timeout: Duration,
    request_delay: Duration,
    max_retry_after: Duration,
    max_dimension: Option<u32>,
    default_tile_edge: u32,
    jpeg_quality: u8,
    template: RequestTemplate,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            retry: RetryPolicy::exponential(DEFAULT_MAX_ATTEMPTS),
            attempt_timeout: Duration::from_secs(DEFAULT_ATTEMPT_TIMEOUT_SECS),
            request_delay: Duration::from_millis(DEFAULT_REQUEST_DELAY_MS),
            max_retry_after: Duration::from_secs(DEFAULT_MAX_RETRY_AFTER_SECS),
            max_dimension: None,
            default_tile_edge: DEFAULT_TILE_EDGE,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            template: RequestTemplate::default(),
        }
    }
}

impl DownloadConfig {
    /// Set the worker count (at least one).
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Replace the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Change only the attempt limit of the current retry policy.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.retry = self.retry.with_max_attempts(attempts.max(1));
        self
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    /// Longest `Retry-After` hint honoured on a rate-limited tile.
    pub fn with_max_retry_after(mut self, max: Duration) -> Self {
        self.max_retry_after = max;
        self
    }

    /// Cap the longer output edge. `None` or `Some(0)` means uncapped.
    pub fn with_max_dimension(mut self, max_dimension: Option<u32>) -> Self {
        self.max_dimension = max_dimension.filter(|d| *d > 0);
        self
    }

    pub fn with_default_tile_edge(mut self, edge: u32) -> Self {
        self.default_tile_edge = edge.max(1);
        self
    }

    /// Set JPEG quality, clamped to 1..=100.
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    pub fn with_template(mut self, template: RequestTemplate) -> Self {
        self.template = template;
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn retry(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn attempt_timeout(&self) -> Duration {
        self.attempt_timeout
    }

    pub fn request_delay(&self) -> Duration {
        self.request_delay
    }

    pub fn max_retry_after(&self) -> Duration {
        self.max_retry_after
    }

    pub fn max_dimension(&self) -> Option<u32> {
        self.max_dimension
    }

    pub fn default_tile_edge(&self) -> u32 {
        self.default_tile_edge
    }

    pub fn jpeg_quality(&self) -> u8 {
        self.jpeg_quality
    }

    pub fn template(&self) -> &RequestTemplate {
        &self.template
    }
}
