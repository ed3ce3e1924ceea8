use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use std::io::Cursor;

use crate::models::NormalizedImage;

#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("cannot decode image: {0}")]
    Decode(#[source] image::ImageError),
    #[error("cannot encode JPEG: {0}")]
    Encode(#[source] image::ImageError),
}

/// Bounds image dimensions and re-encodes as JPEG before upload to the analyzer.
#[derive(Debug, Clone, Copy)]
pub struct ImageNormalizer {
    max_dimension: u32,
    quality: u8,
}

impl ImageNormalizer {
    pub fn new(max_dimension: u32, quality: u8) -> Self {
        Self {
            max_dimension,
            quality: quality.clamp(1, 100),
        }
    }

    pub fn normalize(&self, bytes: &[u8]) -> Result<NormalizedImage, NormalizeError> {
        let img = image::load_from_memory(bytes).map_err(NormalizeError::Decode)?;
        let (src_w, src_h) = img.dimensions();

        // Fit inside the bound keeping aspect ratio; smaller images are left alone.
        let img = if src_w > self.max_dimension || src_h > self.max_dimension {
            img.resize(self.max_dimension, self.max_dimension, FilterType::CatmullRom)
        } else {
            img
        };

        // JPEG has no alpha channel.
        let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
        let (width, height) = rgb.dimensions();

        let mut jpeg = Vec::new();
        let encoder = JpegEncoder::new_with_quality(Cursor::new(&mut jpeg), self.quality);
        rgb.write_with_encoder(encoder).map_err(NormalizeError::Encode)?;

        log::debug!(
            "🖼️ Normalized image {}x{} -> {}x{} ({} -> {} bytes)",
            src_w,
            src_h,
            width,
            height,
            bytes.len(),
            jpeg.len()
        );

        Ok(NormalizedImage { jpeg, width, height })
    }
}
