//! Resolved image source description.

/// Extension forced onto suggested output filenames.
pub const OUTPUT_EXTENSION: &str = "jpg";

/// A resolved tiled image, ready to be planned.
///
/// `native_width`/`native_height` are the requested *output* resolution.
/// They may be capped below the service's true resolution
/// (`full_width`/`full_height`), in which case tile regions are scaled
/// back into full-resolution coordinates when building request URLs.
///
/// # Example
///
/// ```
/// use iiifstitch::source::ImageSource;
///
/// let source = ImageSource::new("abc", "https://host/iiif/2", 3000, 2000, 1024);
/// assert_eq!(source.iiif_base(), "https://host/iiif/2/abc");
///
/// let capped = source.capped_to(1500);
/// assert_eq!((capped.native_width(), capped.native_height()), (1500, 1000));
/// assert_eq!((capped.full_width(), capped.full_height()), (3000, 2000));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSource {
    identifier: String,
    base_url: String,
    native_width: u32,
    native_height: u32,
    full_width: u32,
    full_height: u32,
    max_tile_edge: u32,
    download_name: Option<String>,
}

impl ImageSource {
    /// Create a source whose output resolution equals the service resolution.
    pub fn new(
        identifier: impl Into<String>,
        base_url: impl Into<String>,
        width: u32,
        height: u32,
        max_tile_edge: u32,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            native_width: width,
            native_height: height,
            full_width: width,
            full_height: height,
            max_tile_edge,
            download_name: None,
        }
    }

    /// Set the output resolution, clamped to the service resolution.
    pub fn with_output_size(mut self, width: u32, height: u32) -> Self {
        self.native_width = width.min(self.full_width);
        self.native_height = height.min(self.full_height);
        self
    }

    /// Attach the suggested download name.
    pub fn with_download_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.download_name = if name.trim().is_empty() {
            None
        } else {
            Some(name)
        };
        self
    }

    /// Cap the output so that its longer edge is at most `max_dimension`.
    ///
    /// Aspect ratio is preserved (rounding down, never below one pixel).
    /// A source already within the limit is returned unchanged.
    pub fn capped_to(mut self, max_dimension: u32) -> Self {
        let longest = self.native_width.max(self.native_height);
        if max_dimension == 0 || longest <= max_dimension {
            return self;
        }
        let scale = |edge: u32| -> u32 {
            ((edge as u64 * max_dimension as u64) / longest as u64).max(1) as u32
        };
        self.native_width = scale(self.native_width);
        self.native_height = scale(self.native_height);
        self
    }

    /// Image identifier on the service.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Service prefix preceding the identifier.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `{base_url}/{identifier}`.
    pub fn iiif_base(&self) -> String {
        format!("{}/{}", self.base_url, self.identifier)
    }

    pub fn native_width(&self) -> u32 {
        self.native_width
    }

    pub fn native_height(&self) -> u32 {
        self.native_height
    }

    pub fn full_width(&self) -> u32 {
        self.full_width
    }

    pub fn full_height(&self) -> u32 {
        self.full_height
    }

    pub fn max_tile_edge(&self) -> u32 {
        self.max_tile_edge
    }

    /// True when the output resolution is below the service resolution.
    pub fn is_scaled(&self) -> bool {
        self.native_width != self.full_width || self.native_height != self.full_height
    }

    /// Suggested output filename with a `.jpg` extension.
    ///
    /// Falls back to the identifier when the page offered no download name.
    pub fn suggested_filename(&self) -> String {
        let stem = self
            .download_name
            .as_deref()
            .unwrap_or(&self.identifier)
            .replace(['/', '\\'], "_");
        let stem = match stem.rsplit_once('.') {
            Some((head, ext)) if !head.is_empty() && ext.len() <= 4 => head.to_string(),
            _ => stem,
        };
        format!("{}.{}", stem, OUTPUT_EXTENSION)
    }
}
