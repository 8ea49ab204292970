//! Bounded-concurrency tile download.
//!
//! # Architecture
//!
//! ```text
//!                 ┌──────────────┐
//!  TileSpecs ───► │ shared queue │
//!                 └──────┬───────┘
//!          ┌─────────────┼─────────────┐
//!          ▼             ▼             ▼
//!      worker 0      worker 1  ...  worker K-1     (one fetch each)
//!          └─────────────┼─────────────┘
//!                        ▼ mpsc
//!                 ┌──────────────┐
//!                 │  Assembler   │  (single owner, serial bookkeeping)
//!                 └──────────────┘
//! ```
//!
//! The first terminal failure cancels the run token: workers stop taking
//! specs, in-flight fetches resolve as cancelled, and the run reports every
//! failure seen.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use image::RgbImage;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::types::{DownloadStats, OrchestratorError, ProgressCallback};
use crate::assembly::{Assembler, AssemblyError};
use crate::fetch::{FetchFailure, TileFetch, TileResult};
use crate::grid::TileSpec;
use crate::source::ImageSource;

/// Log progress every this many placed tiles.
pub const PROGRESS_LOG_INTERVAL: usize = 100;

/// Fetches all tiles of an image with at most `workers` in flight.
pub struct TileOrchestrator<F: TileFetch> {
    fetcher: Arc<F>,
    workers: usize,
    progress: Option<ProgressCallback>,
}

impl<F: TileFetch> TileOrchestrator<F> {
    /// Create an orchestrator running `workers` concurrent fetches (at least one).
    pub fn new(fetcher: Arc<F>, workers: usize) -> Self {
        Self {
            fetcher,
            workers: workers.max(1),
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Fetch every tile in `tiles` and assemble the canvas for `source`.
    ///
    /// # Errors
    ///
    /// - [`OrchestratorError::Cancelled`] if `cancel` fires
    /// - [`OrchestratorError::AssemblyAborted`] if any tile failed terminally
    /// - [`OrchestratorError::Assembly`] if `tiles` does not cover the canvas
    ///   or a tile could not be placed
    pub async fn download(
        &self,
        source: &ImageSource,
        tiles: Vec<TileSpec>,
        cancel: &CancellationToken,
    ) -> Result<(RgbImage, DownloadStats), OrchestratorError> {
        let start = Instant::now();
        let total = tiles.len();
        let worker_count = self.workers.min(total);

        let covered: u64 = tiles.iter().map(TileSpec::area).sum();
        let expected = source.native_width() as u64 * source.native_height() as u64;
        if tiles.is_empty() || covered != expected {
            return Err(AssemblyError::PlanCoverage { covered, expected }.into());
        }

        info!(
            identifier = source.identifier(),
            width = source.native_width(),
            height = source.native_height(),
            tiles = total,
            workers = worker_count,
            "Starting tile download"
        );

        let mut assembler = Assembler::new(source.native_width(), source.native_height(), total);
        let queue = Arc::new(Mutex::new(VecDeque::from(tiles)));
        let run = cancel.child_token();
        let (result_tx, mut result_rx) = mpsc::channel::<TileResult>(worker_count.max(1));

        let mut workers = JoinSet::new();
        for worker_id in 0..worker_count {
            let fetcher = Arc::clone(&self.fetcher);
            let queue = Arc::clone(&queue);
            let result_tx = result_tx.clone();
            let run = run.clone();

            workers.spawn(async move {
                loop {
                    if run.is_cancelled() {
                        break;
                    }
                    let Some(spec) = queue.lock().pop_front() else {
                        break;
                    };
                    let result = fetcher.fetch(spec, run.clone()).await;
                    if matches!(&result.outcome, Err(cause) if *cause != FetchFailure::Cancelled) {
                        // Stop dispatch before the coordinator sees the failure.
                        run.cancel();
                    }
                    if result_tx.send(result).await.is_err() {
                        break;
                    }
                }
                debug!(worker = worker_id, "Tile worker finished");
            });
        }
        drop(result_tx);

        let mut failures = Vec::new();
        let mut assembly_error: Option<AssemblyError> = None;
        let mut retries = 0usize;

        while let Some(result) = result_rx.recv().await {
            retries += result.attempts.saturating_sub(1) as usize;

            match result.into_parts() {
                Ok((spec, image, _)) => {
                    if run.is_cancelled() {
                        // Run is aborting; late successes are discarded.
                        continue;
                    }
                    if let Err(e) = assembler.place(&spec, &image) {
                        warn!(tile = spec.index, error = %e, "Failed to place tile, aborting");
                        assembly_error = Some(e);
                        run.cancel();
                        continue;
                    }

                    let placed = assembler.placed();
                    if let Some(progress) = &self.progress {
                        progress(placed, total);
                    }
                    if placed % PROGRESS_LOG_INTERVAL == 0 {
                        info!(placed, total, "Download progress");
                    }
                }
                Err(err) if err.cause == FetchFailure::Cancelled => {}
                Err(err) => {
                    if failures.is_empty() {
                        warn!(
                            tile = err.spec.index,
                            error = %err.cause,
                            attempts = err.attempts,
                            "Tile failed, aborting download"
                        );
                    }
                    failures.push(err);
                    run.cancel();
                }
            }
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "Tile worker terminated abnormally");
            }
        }

        if cancel.is_cancelled() {
            info!(placed = assembler.placed(), total, "Download cancelled");
            return Err(OrchestratorError::Cancelled);
        }
        if !failures.is_empty() {
            failures.sort_by_key(|f| f.spec.index);
            return Err(OrchestratorError::AssemblyAborted { failures });
        }
        if let Some(e) = assembly_error {
            return Err(OrchestratorError::Assembly(e));
        }

        let successful = assembler.placed();
        let image = assembler.finish()?;
        let stats = DownloadStats {
            total_tiles: total,
            successful,
            failed: 0,
            retries,
            elapsed_secs: start.elapsed().as_secs_f64(),
        };

        info!(
            tiles = stats.total_tiles,
            retries = stats.retries,
            elapsed_secs = format!("{:.2}", stats.elapsed_secs),
            "Tile download complete"
        );

        Ok((image, stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{plan_tiles, RequestTemplate};
    use image::Rgb;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn pattern(x: u32, y: u32) -> Rgb<u8> {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x ^ y) % 256) as u8])
    }

    /// Fetch stub that renders the tile pattern and records concurrency.
    #[derive(Default)]
    struct InstrumentedFetcher {
        in_flight: AtomicUsize,
        high_water: AtomicUsize,
        calls: AtomicUsize,
        fail_index: Option<usize>,
        cancelled: AtomicUsize,
    }

    impl InstrumentedFetcher {
        fn failing_at(index: usize) -> Self {
            Self {
                fail_index: Some(index),
                ..Self::default()
            }
        }
    }

    impl TileFetch for InstrumentedFetcher {
        async fn fetch(&self, spec: TileSpec, cancel: CancellationToken) -> TileResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.high_water.fetch_max(now, Ordering::SeqCst);

            // Vary completion order across tiles.
            let delay = Duration::from_millis(1 + (spec.index as u64 * 7) % 5);
            let outcome = tokio::select! {
                _ = cancel.cancelled() => {
                    self.cancelled.fetch_add(1, Ordering::SeqCst);
                    Err(FetchFailure::Cancelled)
                }
                _ = tokio::time::sleep(delay) => {
                    if self.fail_index == Some(spec.index) {
                        Err(FetchFailure::Permanent("HTTP 404".to_string()))
                    } else {
                        Ok(RgbImage::from_fn(spec.width, spec.height, |tx, ty| {
                            pattern(spec.x + tx, spec.y + ty)
                        }))
                    }
                }
            };

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            TileResult {
                spec,
                outcome,
                attempts: 1,
            }
        }
    }

    fn source(width: u32, height: u32, edge: u32) -> ImageSource {
        ImageSource::new("abc", "https://host/iiif/2", width, height, edge)
    }

    fn tiles(source: &ImageSource) -> Vec<TileSpec> {
        plan_tiles(source, &RequestTemplate::default()).unwrap()
    }

    #[tokio::test]
    async fn test_download_assembles_pattern() {
        let source = source(300, 200, 64);
        let fetcher = Arc::new(InstrumentedFetcher::default());
        let orchestrator = TileOrchestrator::new(Arc::clone(&fetcher), 4);

        let (image, stats) = orchestrator
            .download(&source, tiles(&source), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(image.dimensions(), (300, 200));
        for (x, y, pixel) in image.enumerate_pixels() {
            assert_eq!(*pixel, pattern(x, y));
        }
        assert_eq!(stats.total_tiles, 20);
        assert_eq!(stats.successful, 20);
        assert_eq!(stats.failed, 0);
        assert_eq!(stats.retries, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_never_exceeds_workers() {
        let source = source(1000, 1000, 50);
        let fetcher = Arc::new(InstrumentedFetcher::default());
        let orchestrator = TileOrchestrator::new(Arc::clone(&fetcher), 3);

        orchestrator
            .download(&source, tiles(&source), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 400);
        let high_water = fetcher.high_water.load(Ordering::SeqCst);
        assert!(high_water <= 3, "high-water mark {} exceeds 3", high_water);
        assert!(high_water >= 1);
    }

    #[tokio::test]
    async fn test_permanent_failure_aborts_run() {
        let source = source(400, 400, 40);
        let fetcher = Arc::new(InstrumentedFetcher::failing_at(5));
        let orchestrator = TileOrchestrator::new(Arc::clone(&fetcher), 4);

        let err = orchestrator
            .download(&source, tiles(&source), &CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            OrchestratorError::AssemblyAborted { failures } => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].spec.index, 5);
                assert!(matches!(failures[0].cause, FetchFailure::Permanent(_)));
            }
            other => panic!("Expected AssemblyAborted, got {:?}", other),
        }
        // Dispatch stops once the failure is seen.
        assert!(fetcher.calls.load(Ordering::SeqCst) < 100);
    }

    #[tokio::test]
    async fn test_single_worker_stops_after_failure() {
        let source = source(100, 100, 10);
        let fetcher = Arc::new(InstrumentedFetcher::failing_at(0));
        let orchestrator = TileOrchestrator::new(Arc::clone(&fetcher), 1);

        let result = orchestrator
            .download(&source, tiles(&source), &CancellationToken::new())
            .await;

        assert!(matches!(
            result,
            Err(OrchestratorError::AssemblyAborted { .. })
        ));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_external_cancellation() {
        let source = source(100, 100, 10);
        let fetcher = Arc::new(InstrumentedFetcher::default());
        let orchestrator = TileOrchestrator::new(Arc::clone(&fetcher), 2);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = orchestrator.download(&source, tiles(&source), &cancel).await;

        assert!(matches!(result, Err(OrchestratorError::Cancelled)));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_progress_callback() {
        let source = source(90, 30, 30);
        let fetcher = Arc::new(InstrumentedFetcher::default());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let orchestrator = TileOrchestrator::new(fetcher, 2)
            .with_progress(Arc::new(move |placed, total| sink.lock().push((placed, total))));

        orchestrator
            .download(&source, tiles(&source), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(*seen.lock(), vec![(1, 3), (2, 3), (3, 3)]);
    }

    #[tokio::test]
    async fn test_duplicate_index_reports_assembly_error() {
        let source = source(20, 20, 10);
        let mut plan = tiles(&source);
        plan[3].index = 1;
        let orchestrator = TileOrchestrator::new(Arc::new(InstrumentedFetcher::default()), 1);

        let err = orchestrator
            .download(&source, plan, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            OrchestratorError::Assembly(AssemblyError::DuplicateTile { index: 1 })
        ));
    }

    #[tokio::test]
    async fn test_empty_plan_rejected() {
        let source = source(64, 64, 32);
        let fetcher = Arc::new(InstrumentedFetcher::default());
        let orchestrator = TileOrchestrator::new(Arc::clone(&fetcher), 2);

        let err = orchestrator
            .download(&source, Vec::new(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            OrchestratorError::Assembly(AssemblyError::PlanCoverage {
                covered: 0,
                expected: 4096
            })
        ));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_partial_plan_rejected() {
        let source = source(64, 64, 32);
        let mut plan = tiles(&source);
        plan.pop();
        let fetcher = Arc::new(InstrumentedFetcher::default());
        let orchestrator = TileOrchestrator::new(Arc::clone(&fetcher), 2);

        let err = orchestrator
            .download(&source, plan, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            OrchestratorError::Assembly(AssemblyError::PlanCoverage {
                covered: 3072,
                expected: 4096
            })
        ));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_workers_at_least_one() {
        let orchestrator = TileOrchestrator::new(Arc::new(InstrumentedFetcher::default()), 0);
        assert_eq!(orchestrator.workers(), 1);
    }
}
