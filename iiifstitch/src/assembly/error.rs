//! Assembly error types.

use thiserror::Error;

/// Errors raised while placing tiles into the canvas.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblyError {
    /// A decoded tile is smaller than its planned rectangle.
    #[error("tile #{index} decoded to {actual_width}x{actual_height}, expected {expected_width}x{expected_height}")]
    TileSizeMismatch {
        index: usize,
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    /// A tile index was placed more than once.
    #[error("tile #{index} was already placed")]
    DuplicateTile { index: usize },

    /// A tile falls outside the canvas or the planned tile range.
    #[error("tile #{index} lies outside the {canvas_width}x{canvas_height} canvas")]
    OutOfBounds {
        index: usize,
        canvas_width: u32,
        canvas_height: u32,
    },

    /// The planned tiles do not cover the canvas exactly once.
    #[error("tile plan covers {covered} pixels, canvas has {expected}")]
    PlanCoverage { covered: u64, expected: u64 },

    /// The canvas was finished before every tile arrived.
    #[error("only {placed} of {total} tiles were placed")]
    Incomplete { placed: usize, total: usize },
}
