//! Tile download orchestration
//!
//! Drives every planned tile through a [`TileFetch`](crate::fetch::TileFetch)
//! implementation with a fixed number of workers, and assembles the results
//! into the output canvas.

mod download;
mod types;

pub use download::{TileOrchestrator, PROGRESS_LOG_INTERVAL};
pub use types::{DownloadStats, OrchestratorError, ProgressCallback};
