//! Fill transform: center-crop to the target aspect ratio, then resize

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::ImageFormat;
use std::fmt;

/// Default JPEG encode quality
pub const DEFAULT_JPEG_QUALITY: u8 = 85;

#[derive(Debug)]
pub enum TransformError {
    Decode(image::ImageError),
    Encode(image::ImageError),
}

impl fmt::Display for TransformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransformError::Decode(err) => write!(f, "Failed to decode JPEG: {}", err),
            TransformError::Encode(err) => write!(f, "Failed to encode JPEG: {}", err),
        }
    }
}

impl std::error::Error for TransformError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransformError::Decode(err) | TransformError::Encode(err) => Some(err),
        }
    }
}

/// Turns source JPEG bytes into resized JPEG bytes of exactly the requested size
pub trait ImageTransform: Send + Sync {
    fn fill(&self, source: &[u8], width: u32, height: u32) -> Result<Vec<u8>, TransformError>;
}

/// Centered fill with Lanczos3 resampling
#[derive(Debug, Clone)]
pub struct LanczosFill {
    quality: u8,
}

impl LanczosFill {
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }
}

impl Default for LanczosFill {
    fn default() -> Self {
        Self::new(DEFAULT_JPEG_QUALITY)
    }
}

impl ImageTransform for LanczosFill {
    fn fill(&self, source: &[u8], width: u32, height: u32) -> Result<Vec<u8>, TransformError> {
        let decoded = image::load_from_memory_with_format(source, ImageFormat::Jpeg)
            .map_err(TransformError::Decode)?;

        let filled = decoded
            .resize_to_fill(width, height, FilterType::Lanczos3)
            .to_rgb8();

        let mut encoded = Vec::new();
        JpegEncoder::new_with_quality(&mut encoded, self.quality)
            .encode_image(&filled)
            .map_err(TransformError::Encode)?;
        Ok(encoded)
    }
}

/// Encode a synthetic gradient as JPEG
#[cfg(test)]
pub(crate) fn sample_jpeg(width: u32, height: u32) -> Vec<u8> {
    let image = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, 90)
        .encode_image(&image)
        .unwrap();
    bytes
}
