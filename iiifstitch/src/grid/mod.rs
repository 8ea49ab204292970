//! Tile grid planning
//!
//! Partitions an [`ImageSource`](crate::source::ImageSource) into
//! [`TileSpec`]s, each carrying its canvas offset and request URL.

mod planner;
mod types;

pub use planner::{grid_dimensions, plan_tiles};
pub use types::{PlanError, RequestTemplate, TileSpec};
