//! Top-level service errors.

use thiserror::Error;

use crate::grid::PlanError;
use crate::orchestrator::OrchestratorError;
use crate::source::ResolveError;

/// Errors from a reconstruction run.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Could not resolve image: {0}")]
    Resolve(#[from] ResolveError),

    #[error("Could not plan tiles: {0}")]
    Plan(#[from] PlanError),

    #[error("{0}")]
    Download(OrchestratorError),

    #[error("Reconstruction cancelled")]
    Cancelled,

    #[error("Failed to encode output: {0}")]
    Encode(#[from] image::ImageError),
}

impl ServiceError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ServiceError::Cancelled)
    }
}

impl From<OrchestratorError> for ServiceError {
    fn from(e: OrchestratorError) -> Self {
        match e {
            OrchestratorError::Cancelled => ServiceError::Cancelled,
            other => ServiceError::Download(other),
        }
    }
}
