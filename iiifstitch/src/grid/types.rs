//! Tile grid types.

use std::fmt;

/// One planned tile: its place in the output canvas and the URL to fetch it.
///
/// `x`/`y` are the top-left offset in the canvas; `index` is the tile's
/// position in row-major order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TileSpec {
    pub index: usize,
    pub row: u32,
    pub col: u32,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub request_url: String,
}

impl TileSpec {
    /// Number of pixels the tile covers.
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Exclusive right edge in canvas coordinates.
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Exclusive bottom edge in canvas coordinates.
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// True when the two tiles share at least one pixel.
    pub fn overlaps(&self, other: &TileSpec) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

impl fmt::Display for TileSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tile #{} (row {}, col {}) {}x{} at ({}, {})",
            self.index, self.row, self.col, self.width, self.height, self.x, self.y
        )
    }
}

/// Fixed parameters of the tile request URL.
///
/// Rotation, quality and format do not vary per tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTemplate {
    pub rotation: String,
    pub quality: String,
    pub format: String,
}

impl Default for RequestTemplate {
    fn default() -> Self {
        Self {
            rotation: "0".to_string(),
            quality: "default".to_string(),
            format: crate::source::DEFAULT_TILE_FORMAT.to_string(),
        }
    }
}

impl RequestTemplate {
    /// `{iiif_base}/{region}/{size}/{rotation}/{quality}.{format}`
    pub fn url(&self, iiif_base: &str, region: &str, size: &str) -> String {
        format!(
            "{}/{}/{}/{}/{}.{}",
            iiif_base, region, size, self.rotation, self.quality, self.format
        )
    }
}

/// Errors raised before any tile is planned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// A canvas dimension or the tile edge is zero.
    InvalidDimensions {
        width: u32,
        height: u32,
        tile_edge: u32,
    },
}

impl fmt::Display for PlanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanError::InvalidDimensions {
                width,
                height,
                tile_edge,
            } => write!(
                f,
                "Invalid dimensions {}×{} with tile edge {}",
                width, height, tile_edge
            ),
        }
    }
}

impl std::error::Error for PlanError {}
