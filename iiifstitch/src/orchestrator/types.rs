//! Orchestrator types and errors

use std::fmt;
use std::sync::Arc;

use crate::assembly::AssemblyError;
use crate::fetch::TileFetchError;

/// Called with `(placed, total)` after each tile is placed.
pub type ProgressCallback = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Errors that end a download run.
#[derive(Debug)]
pub enum OrchestratorError {
    /// One or more tiles failed terminally; no image is produced.
    AssemblyAborted { failures: Vec<TileFetchError> },
    /// The caller cancelled the run.
    Cancelled,
    /// A fetched tile could not be placed.
    Assembly(AssemblyError),
}

impl fmt::Display for OrchestratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrchestratorError::AssemblyAborted { failures } => {
                write!(f, "Assembly aborted: {} tile(s) failed", failures.len())?;
                if let Some(first) = failures.first() {
                    write!(f, "; first: {}", first)?;
                }
                Ok(())
            }
            OrchestratorError::Cancelled => write!(f, "Download cancelled"),
            OrchestratorError::Assembly(e) => write!(f, "Assembly error: {}", e),
        }
    }
}

impl std::error::Error for OrchestratorError {}

impl From<AssemblyError> for OrchestratorError {
    fn from(e: AssemblyError) -> Self {
        OrchestratorError::Assembly(e)
    }
}

/// Statistics about a completed download.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DownloadStats {
    /// Number of planned tiles
    pub total_tiles: usize,
    /// Tiles fetched and placed
    pub successful: usize,
    /// Tiles that failed terminally
    pub failed: usize,
    /// Extra attempts beyond the first, across all tiles
    pub retries: usize,
    /// Total time elapsed in seconds
    pub elapsed_secs: f64,
}
