//! End-to-end reconstruction: resolve, plan, download, assemble.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use super::error::ServiceError;
use super::output::AssembledImage;
use crate::config::DownloadConfig;
use crate::fetch::TileFetcher;
use crate::grid::plan_tiles;
use crate::orchestrator::{ProgressCallback, TileOrchestrator};
use crate::provider::AsyncHttpClient;
use crate::source::{ImageSource, Resolver, SourceResolver};

/// Reconstructs a full image from a tiled image service.
///
/// # Example
///
/// ```ignore
/// use iiifstitch::config::DownloadConfig;
/// use iiifstitch::provider::AsyncReqwestClient;
/// use iiifstitch::service::ReconstructionService;
/// use tokio_util::sync::CancellationToken;
///
/// let client = AsyncReqwestClient::new()?;
/// let service = ReconstructionService::with_http(client, DownloadConfig::default());
/// let output = service
///     .reconstruct("https://www.artic.edu/artworks/28560/the-bedroom", CancellationToken::new())
///     .await?;
/// std::fs::write(output.filename(), output.encode_jpeg(90)?)?;
/// ```
pub struct ReconstructionService<R: Resolver, C: AsyncHttpClient + 'static> {
    resolver: R,
    fetcher: Arc<TileFetcher<C>>,
    config: DownloadConfig,
    progress: Option<ProgressCallback>,
}

impl<C: AsyncHttpClient + Clone + 'static> ReconstructionService<SourceResolver<C>, C> {
    /// Build a service that resolves and fetches through `client`.
    pub fn with_http(client: C, config: DownloadConfig) -> Self {
        let resolver = SourceResolver::from_config(client.clone(), &config);
        Self::new(resolver, client, config)
    }
}

impl<R: Resolver, C: AsyncHttpClient + 'static> ReconstructionService<R, C> {
    pub fn new(resolver: R, client: C, config: DownloadConfig) -> Self {
        let fetcher = Arc::new(TileFetcher::from_config(client, &config));
        Self {
            resolver,
            fetcher,
            config,
            progress: None,
        }
    }

    /// Report `(placed, total)` after each tile.
    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn config(&self) -> &DownloadConfig {
        &self.config
    }

    /// Resolve `reference` and apply the configured size cap.
    pub async fn resolve(&self, reference: &str) -> Result<ImageSource, ServiceError> {
        let source = self.resolver.resolve(reference).await?;
        Ok(match self.config.max_dimension() {
            Some(max) => source.capped_to(max),
            None => source,
        })
    }

    /// Run the whole pipeline for `reference`.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Resolve`] if metadata discovery fails
    /// - [`ServiceError::Plan`] if the resolved dimensions are degenerate
    /// - [`ServiceError::Download`] if any tile failed or could not be placed
    /// - [`ServiceError::Cancelled`] if `cancel` fires
    pub async fn reconstruct(
        &self,
        reference: &str,
        cancel: CancellationToken,
    ) -> Result<AssembledImage, ServiceError> {
        info!(reference, "Resolving image");
        let source = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ServiceError::Cancelled),
            source = self.resolve(reference) => source?,
        };

        info!(
            identifier = source.identifier(),
            full_width = source.full_width(),
            full_height = source.full_height(),
            width = source.native_width(),
            height = source.native_height(),
            tile_edge = source.max_tile_edge(),
            "Resolved image"
        );

        let tiles = plan_tiles(&source, self.config.template())?;

        let mut orchestrator = TileOrchestrator::new(Arc::clone(&self.fetcher), self.config.workers());
        if let Some(progress) = &self.progress {
            orchestrator = orchestrator.with_progress(Arc::clone(progress));
        }
        let (image, stats) = orchestrator.download(&source, tiles, &cancel).await?;

        Ok(AssembledImage::new(image, source.suggested_filename(), stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{encode_png, RetryPolicy};
    use crate::orchestrator::OrchestratorError;
    use crate::provider::{MockAsyncHttpClient, ProviderError, ScriptedHttpClient};
    use crate::source::ResolveError;
    use image::{Rgb, RgbImage};
    use parking_lot::Mutex;
    use std::time::Duration;

    struct FixedResolver(ImageSource);

    impl Resolver for FixedResolver {
        async fn resolve(&self, _reference: &str) -> Result<ImageSource, ResolveError> {
            Ok(self.0.clone())
        }
    }

    struct FailingResolver;

    impl Resolver for FailingResolver {
        async fn resolve(&self, reference: &str) -> Result<ImageSource, ResolveError> {
            Err(ResolveError::Resolution {
                reference: reference.to_string(),
                reason: "no identifier".to_string(),
            })
        }
    }

    fn quick_config() -> DownloadConfig {
        DownloadConfig::default()
            .with_workers(2)
            .with_retry(RetryPolicy::fixed(2, Duration::from_millis(1)))
    }

    #[tokio::test]
    async fn test_single_tile_reconstruction() {
        let source = ImageSource::new("abc", "https://host/iiif/2", 8, 6, 256)
            .with_download_name("sunflowers.tif");
        let client = MockAsyncHttpClient {
            response: Ok(encode_png(&RgbImage::from_pixel(8, 6, Rgb([1, 2, 3])))),
        };
        let service = ReconstructionService::new(FixedResolver(source), client, quick_config());

        let output = service
            .reconstruct("anything", CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(output.filename(), "sunflowers.jpg");
        assert_eq!(output.image().dimensions(), (8, 6));
        assert_eq!(output.image().get_pixel(7, 5), &Rgb([1, 2, 3]));
        assert_eq!(output.stats().total_tiles, 1);
    }

    #[tokio::test]
    async fn test_max_dimension_caps_output() {
        let source = ImageSource::new("abc", "https://host/iiif/2", 400, 200, 512);
        let client = ScriptedHttpClient::new().route(
            "https://host/iiif/2/abc/0,0,400,200/100,50/0/default.jpg",
            Ok(encode_png(&RgbImage::new(100, 50))),
        );
        let service = ReconstructionService::new(
            FixedResolver(source),
            client,
            quick_config().with_max_dimension(Some(100)),
        );

        let output = service
            .reconstruct("anything", CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(output.image().dimensions(), (100, 50));
    }

    #[tokio::test]
    async fn test_resolution_error_surfaces() {
        let service = ReconstructionService::new(
            FailingResolver,
            ScriptedHttpClient::new(),
            quick_config(),
        );

        let err = service
            .reconstruct("https://host/page", CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Resolve(_)));
    }

    #[tokio::test]
    async fn test_zero_dimension_rejected_before_fetching() {
        let source = ImageSource::new("abc", "https://host/iiif/2", 0, 10, 256);
        let client = ScriptedHttpClient::new();
        let service = ReconstructionService::new(FixedResolver(source), client, quick_config());

        let err = service
            .reconstruct("anything", CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Plan(_)));
        assert_eq!(service.fetcher_calls(), 0);
    }

    #[tokio::test]
    async fn test_failed_tile_aborts_without_image() {
        let source = ImageSource::new("abc", "https://host/iiif/2", 20, 10, 10);
        let client = ScriptedHttpClient::new()
            .route(
                "https://host/iiif/2/abc/0,0,10,10/10,10/0/default.jpg",
                Ok(encode_png(&RgbImage::new(10, 10))),
            )
            .route(
                "https://host/iiif/2/abc/10,0,10,10/10,10/0/default.jpg",
                Err(ProviderError::Status {
                    status: 403,
                    url: "tile".to_string(),
                    retry_after: None,
                }),
            );
        let service = ReconstructionService::new(FixedResolver(source), client, quick_config());

        let err = service
            .reconstruct("anything", CancellationToken::new())
            .await
            .unwrap_err();
        match err {
            ServiceError::Download(OrchestratorError::AssemblyAborted { failures }) => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].spec.index, 1);
            }
            other => panic!("Expected AssemblyAborted, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_cancelled_before_resolution() {
        let service = ReconstructionService::new(
            FailingResolver,
            ScriptedHttpClient::new(),
            quick_config(),
        );
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = service.reconstruct("x", cancel).await.unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn test_progress_forwarded() {
        let source = ImageSource::new("abc", "https://host/iiif/2", 4, 4, 256);
        let client = MockAsyncHttpClient {
            response: Ok(encode_png(&RgbImage::new(4, 4))),
        };
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let service = ReconstructionService::new(FixedResolver(source), client, quick_config())
            .with_progress(Arc::new(move |placed, total| sink.lock().push((placed, total))));

        service
            .reconstruct("anything", CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(*seen.lock(), vec![(1, 1)]);
    }

    impl<R: Resolver> ReconstructionService<R, ScriptedHttpClient> {
        fn fetcher_calls(&self) -> usize {
            self.fetcher.client().calls()
        }
    }
}
