//! Addressable canvas with offset writes.

use image::RgbImage;

use super::error::AssemblyError;
use crate::grid::TileSpec;

const CHANNELS: usize = 3;

/// Places decoded tiles into an RGB canvas at their planned offsets.
///
/// Tiles may arrive in any order. Each planned index is accepted once;
/// [`finish`](Self::finish) hands back the canvas only when all are in.
///
/// # Example
///
/// ```
/// use iiifstitch::assembly::Assembler;
/// use iiifstitch::grid::{plan_tiles, RequestTemplate};
/// use iiifstitch::source::ImageSource;
/// use image::{Rgb, RgbImage};
///
/// let source = ImageSource::new("abc", "https://host/iiif/2", 3, 2, 2);
/// let tiles = plan_tiles(&source, &RequestTemplate::default()).unwrap();
/// let mut assembler = Assembler::new(3, 2, tiles.len());
///
/// for spec in tiles.iter().rev() {
///     let tile = RgbImage::from_pixel(spec.width, spec.height, Rgb([spec.index as u8, 0, 0]));
///     assembler.place(spec, &tile).unwrap();
/// }
///
/// let canvas = assembler.finish().unwrap();
/// assert_eq!(canvas.get_pixel(2, 1), &Rgb([1, 0, 0]));
/// ```
#[derive(Debug)]
pub struct Assembler {
    canvas: RgbImage,
    placed: Vec<bool>,
    placed_count: usize,
}

impl Assembler {
    /// Allocate a `width`×`height` canvas expecting `tile_count` tiles.
    pub fn new(width: u32, height: u32, tile_count: usize) -> Self {
        Self {
            canvas: RgbImage::new(width, height),
            placed: vec![false; tile_count],
            placed_count: 0,
        }
    }

    /// Copy `tile` into the canvas at `spec`'s offset.
    ///
    /// Only the `spec.width`×`spec.height` top-left region of `tile` is
    /// used; a larger tile is cropped.
    ///
    /// # Errors
    ///
    /// - [`AssemblyError::OutOfBounds`] if the index or rectangle is outside the plan
    /// - [`AssemblyError::DuplicateTile`] if the index was already placed
    /// - [`AssemblyError::TileSizeMismatch`] if `tile` is smaller than the planned rectangle
    pub fn place(&mut self, spec: &TileSpec, tile: &RgbImage) -> Result<(), AssemblyError> {
        let (canvas_width, canvas_height) = self.canvas.dimensions();
        let out_of_bounds = spec.index >= self.placed.len()
            || spec.width == 0
            || spec.height == 0
            || spec.x as u64 + spec.width as u64 > canvas_width as u64
            || spec.y as u64 + spec.height as u64 > canvas_height as u64;
        if out_of_bounds {
            return Err(AssemblyError::OutOfBounds {
                index: spec.index,
                canvas_width,
                canvas_height,
            });
        }
        if self.placed[spec.index] {
            return Err(AssemblyError::DuplicateTile { index: spec.index });
        }
        let (tile_width, tile_height) = tile.dimensions();
        if tile_width < spec.width || tile_height < spec.height {
            return Err(AssemblyError::TileSizeMismatch {
                index: spec.index,
                expected_width: spec.width,
                expected_height: spec.height,
                actual_width: tile_width,
                actual_height: tile_height,
            });
        }

        let row_len = spec.width as usize * CHANNELS;
        let src_stride = tile_width as usize * CHANNELS;
        let dst_stride = canvas_width as usize * CHANNELS;
        let src = tile.as_raw();
        let dst: &mut [u8] = &mut self.canvas;

        for row in 0..spec.height as usize {
            let src_start = row * src_stride;
            let dst_start = (spec.y as usize + row) * dst_stride + spec.x as usize * CHANNELS;
            dst[dst_start..dst_start + row_len].copy_from_slice(&src[src_start..src_start + row_len]);
        }

        self.placed[spec.index] = true;
        self.placed_count += 1;
        Ok(())
    }

    pub fn placed(&self) -> usize {
        self.placed_count
    }

    pub fn total(&self) -> usize {
        self.placed.len()
    }

    pub fn is_complete(&self) -> bool {
        self.placed_count == self.placed.len()
    }

    /// Return the completed canvas.
    ///
    /// # Errors
    ///
    /// Returns [`AssemblyError::Incomplete`] if any tile is missing.
    pub fn finish(self) -> Result<RgbImage, AssemblyError> {
        if !self.is_complete() {
            return Err(AssemblyError::Incomplete {
                placed: self.placed_count,
                total: self.placed.len(),
            });
        }
        Ok(self.canvas)
    }
}
