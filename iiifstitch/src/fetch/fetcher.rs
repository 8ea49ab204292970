//! Retrying tile fetcher.
//!
//! ```text
//! TileSpec ──► [delay] ──► GET (timeout) ──► decode (blocking pool) ──► TileResult
//!                 ▲                 │
//!                 └── backoff ◄─────┘ transient failure
//! ```

use std::future::Future;
use std::time::{Duration, Instant};

use image::RgbImage;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::error::{FetchFailure, TileFetchError};
use super::policy::RetryPolicy;
use crate::config::DownloadConfig;
use crate::grid::TileSpec;
use crate::provider::AsyncHttpClient;

/// Terminal outcome for one tile.
#[derive(Debug)]
pub struct TileResult {
    pub spec: TileSpec,
    pub outcome: Result<RgbImage, FetchFailure>,
    /// Attempts made, including the successful one.
    pub attempts: u32,
}

impl TileResult {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Split into the decoded tile or a [`TileFetchError`] naming the tile.
    pub fn into_parts(self) -> Result<(TileSpec, RgbImage, u32), TileFetchError> {
        match self.outcome {
            Ok(image) => Ok((self.spec, image, self.attempts)),
            Err(cause) => Err(TileFetchError {
                spec: self.spec,
                cause,
                attempts: self.attempts,
            }),
        }
    }
}

/// Fetches and decodes a single tile.
///
/// Implementations must resolve promptly once `cancel` fires, returning
/// [`FetchFailure::Cancelled`].
pub trait TileFetch: Send + Sync + 'static {
    fn fetch(
        &self,
        spec: TileSpec,
        cancel: CancellationToken,
    ) -> impl Future<Output = TileResult> + Send;
}

/// HTTP tile fetcher applying a [`RetryPolicy`].
pub struct TileFetcher<C> {
    client: C,
    policy: RetryPolicy,
    attempt_timeout: Duration,
    request_delay: Duration,
    max_retry_after: Duration,
}

impl<C: AsyncHttpClient + 'static> TileFetcher<C> {
    pub fn new(client: C, policy: RetryPolicy) -> Self {
        Self {
            client,
            policy,
            attempt_timeout: Duration::from_secs(crate::config::DEFAULT_ATTEMPT_TIMEOUT_SECS),
            request_delay: Duration::ZERO,
            max_retry_after: Duration::from_secs(crate::config::DEFAULT_MAX_RETRY_AFTER_SECS),
        }
    }

    /// Build a fetcher from the retry, timeout and pacing settings of `config`.
    pub fn from_config(client: C, config: &DownloadConfig) -> Self {
        Self::new(client, config.retry().clone())
            .with_attempt_timeout(config.attempt_timeout())
            .with_request_delay(config.request_delay())
            .with_max_retry_after(config.max_retry_after())
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    /// Longest server `Retry-After` hint to wait for.
    pub fn with_max_retry_after(mut self, max: Duration) -> Self {
        self.max_retry_after = max;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// One request plus decode, bounded by the attempt timeout.
    async fn attempt(
        &self,
        spec: &TileSpec,
        cancel: &CancellationToken,
    ) -> Result<RgbImage, FetchFailure> {
        if !self.request_delay.is_zero() {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(FetchFailure::Cancelled),
                _ = tokio::time::sleep(self.request_delay) => {}
            }
        }

        let request = tokio::time::timeout(self.attempt_timeout, self.client.get(&spec.request_url));
        let bytes = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(FetchFailure::Cancelled),
            response = request => match response {
                Ok(body) => body?,
                Err(_) => return Err(FetchFailure::Timeout(self.attempt_timeout)),
            },
        };

        decode_tile(bytes).await
    }

    /// Delay before the next attempt, or `None` to give up.
    ///
    /// A rate-limit hint extends the backoff, never shortens it.
    fn retry_delay(&self, failure: &FetchFailure, attempt: u32) -> Option<Duration> {
        if !failure.is_retryable() {
            return None;
        }
        let backoff = self.policy.jittered_delay(attempt)?;
        match failure {
            FetchFailure::RateLimited {
                retry_after: Some(hint),
            } => Some(backoff.max((*hint).min(self.max_retry_after))),
            _ => Some(backoff),
        }
    }
}

impl<C: AsyncHttpClient + 'static> TileFetch for TileFetcher<C> {
    async fn fetch(&self, spec: TileSpec, cancel: CancellationToken) -> TileResult {
        let start = Instant::now();
        let mut attempts = 0;

        loop {
            if cancel.is_cancelled() {
                return TileResult {
                    spec,
                    outcome: Err(FetchFailure::Cancelled),
                    attempts,
                };
            }
            attempts += 1;

            let failure = match self.attempt(&spec, &cancel).await {
                Ok(image) => {
                    debug!(
                        tile = spec.index,
                        attempts,
                        duration_ms = start.elapsed().as_millis() as u64,
                        "Tile fetched"
                    );
                    return TileResult {
                        spec,
                        outcome: Ok(image),
                        attempts,
                    };
                }
                Err(failure) => failure,
            };

            let Some(delay) = self.retry_delay(&failure, attempts) else {
                if failure != FetchFailure::Cancelled {
                    debug!(tile = spec.index, attempts, error = %failure, "Tile fetch gave up");
                }
                return TileResult {
                    spec,
                    outcome: Err(failure),
                    attempts,
                };
            };

            warn!(
                tile = spec.index,
                attempt = attempts,
                error = %failure,
                delay_ms = delay.as_millis() as u64,
                "Tile fetch failed, retrying"
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

/// Decode an image body to RGB on the blocking pool.
pub async fn decode_tile(bytes: Vec<u8>) -> Result<RgbImage, FetchFailure> {
    tokio::task::spawn_blocking(move || image::load_from_memory(&bytes).map(|img| img.to_rgb8()))
        .await
        .map_err(|e| FetchFailure::Decode(format!("decoder task failed: {}", e)))?
        .map_err(|e| FetchFailure::Decode(e.to_string()))
}
