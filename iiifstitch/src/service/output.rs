//! Assembled output handed to the writer.

use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;

use super::error::ServiceError;
use crate::orchestrator::DownloadStats;

/// A fully assembled image with its suggested filename.
#[derive(Debug, Clone)]
pub struct AssembledImage {
    image: RgbImage,
    filename: String,
    stats: DownloadStats,
}

impl AssembledImage {
    pub fn new(image: RgbImage, filename: impl Into<String>, stats: DownloadStats) -> Self {
        Self {
            image,
            filename: filename.into(),
            stats,
        }
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn stats(&self) -> &DownloadStats {
        &self.stats
    }

    /// Encode the canvas as JPEG at `quality` (1-100).
    pub fn encode_jpeg(&self, quality: u8) -> Result<Vec<u8>, ServiceError> {
        let mut buf = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100));
        self.image.write_with_encoder(encoder)?;
        Ok(buf)
    }
}
