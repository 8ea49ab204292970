//! Tile grid planning.

use super::types::{PlanError, RequestTemplate, TileSpec};
use crate::source::ImageSource;

/// Number of tile columns and rows needed to cover the source.
///
/// # Errors
///
/// Returns [`PlanError::InvalidDimensions`] for a zero width, height or tile edge.
pub fn grid_dimensions(source: &ImageSource) -> Result<(u32, u32), PlanError> {
    let (width, height, edge) = validate(source)?;
    Ok((width.div_ceil(edge), height.div_ceil(edge)))
}

/// Plan the tiles covering `source` in row-major order.
///
/// Tiles step across the canvas in `max_tile_edge` increments; edge tiles
/// take whatever remains. The tiles partition the canvas exactly.
///
/// # Example
///
/// ```
/// use iiifstitch::grid::{plan_tiles, RequestTemplate};
/// use iiifstitch::source::ImageSource;
///
/// let source = ImageSource::new("abc", "https://host/iiif/2", 3000, 3000, 1024);
/// let tiles = plan_tiles(&source, &RequestTemplate::default()).unwrap();
///
/// assert_eq!(tiles.len(), 9);
/// assert_eq!((tiles[8].x, tiles[8].y), (2048, 2048));
/// assert_eq!((tiles[8].width, tiles[8].height), (952, 952));
/// ```
///
/// # Errors
///
/// Returns [`PlanError::InvalidDimensions`] for a zero width, height or tile edge.
pub fn plan_tiles(
    source: &ImageSource,
    template: &RequestTemplate,
) -> Result<Vec<TileSpec>, PlanError> {
    let (width, height, edge) = validate(source)?;
    let (cols, rows) = (width.div_ceil(edge), height.div_ceil(edge));
    let whole_image = cols == 1 && rows == 1 && !source.is_scaled();
    let iiif_base = source.iiif_base();

    let mut tiles = Vec::with_capacity(cols as usize * rows as usize);
    for row in 0..rows {
        let y = row * edge;
        let tile_height = edge.min(height - y);
        for col in 0..cols {
            let x = col * edge;
            let tile_width = edge.min(width - x);

            let region = if whole_image {
                "full".to_string()
            } else {
                region_for(source, x, y, tile_width, tile_height)
            };
            let size = format!("{},{}", tile_width, tile_height);

            tiles.push(TileSpec {
                index: tiles.len(),
                row,
                col,
                x,
                y,
                width: tile_width,
                height: tile_height,
                request_url: template.url(&iiif_base, &region, &size),
            });
        }
    }
    Ok(tiles)
}

fn validate(source: &ImageSource) -> Result<(u32, u32, u32), PlanError> {
    let (width, height, edge) = (
        source.native_width(),
        source.native_height(),
        source.max_tile_edge(),
    );
    if width == 0 || height == 0 || edge == 0 {
        return Err(PlanError::InvalidDimensions {
            width,
            height,
            tile_edge: edge,
        });
    }
    Ok((width, height, edge))
}

/// Map an output rectangle to the service's full-resolution region.
///
/// Both edges are floored so that neighbouring regions stay contiguous.
fn region_for(source: &ImageSource, x: u32, y: u32, width: u32, height: u32) -> String {
    let scale = |value: u32, full: u32, native: u32| -> u64 {
        value as u64 * full as u64 / native as u64
    };
    let (fw, nw) = (source.full_width(), source.native_width());
    let (fh, nh) = (source.full_height(), source.native_height());

    let rx = scale(x, fw, nw);
    let ry = scale(y, fh, nh);
    let rw = scale(x + width, fw, nw) - rx;
    let rh = scale(y + height, fh, nh) - ry;
    format!("{},{},{},{}", rx, ry, rw, rh)
}
