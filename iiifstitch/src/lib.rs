//! iiifstitch - Full-resolution images from tiled IIIF image services
//!
//! Image services built on the IIIF Image API only hand out bounded
//! regions of a large image. This crate discovers an image's identifier and
//! resolution, plans a grid of tile requests, fetches the tiles with
//! bounded concurrency and retries, and stitches them into one canvas.
//!
//! ```text
//! source ──► grid ──► orchestrator ──► fetch (K workers)
//!                          │
//!                          └──► assembly ──► service::AssembledImage
//! ```

pub mod assembly;
pub mod config;
pub mod fetch;
pub mod grid;
pub mod logging;
pub mod orchestrator;
pub mod provider;
pub mod service;
pub mod source;
