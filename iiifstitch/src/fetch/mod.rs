//! Tile fetching
//!
//! A [`TileFetcher`] turns one [`TileSpec`](crate::grid::TileSpec) into a
//! decoded RGB tile, retrying transient failures per its [`RetryPolicy`].
//! The orchestrator depends only on the [`TileFetch`] trait.

mod error;
mod fetcher;
mod policy;

pub use error::{FetchFailure, TileFetchError};
pub use fetcher::{decode_tile, TileFetch, TileFetcher, TileResult};
pub use policy::{RetryPolicy, DEFAULT_BACKOFF_MULTIPLIER, DEFAULT_JITTER};

#[cfg(test)]
pub use fetcher::tests::encode_png;
