//! Reconstruction service
//!
//! Ties the pipeline together:
//!
//! ```text
//! reference ──► Resolver ──► ImageSource ──► plan_tiles ──► TileOrchestrator ──► AssembledImage
//! ```

mod error;
mod output;
mod reconstruct;

pub use error::ServiceError;
pub use output::AssembledImage;
pub use reconstruct::ReconstructionService;
