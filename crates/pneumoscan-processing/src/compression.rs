use bytes::Bytes;
use image::{DynamicImage, RgbImage};

use crate::error::ProcessingError;

/// Media type of every re-encoded upload
pub const JPEG_CONTENT_TYPE: &str = "image/jpeg";

/// Encodes a rendered surface into an upload payload.
///
/// Implementations run on a blocking worker thread and must not share mutable
/// state between calls.
pub trait RasterEncoder: Send + Sync {
    /// Media type of the produced payload
    fn content_type(&self) -> &'static str;

    /// Encode at the given quality (1-100). An empty payload is treated by the
    /// caller as a failed encode.
    fn encode(&self, img: &DynamicImage, quality: u8) -> Result<Bytes, ProcessingError>;
}

/// JPEG encoder. Uses the `image` crate codec, or mozjpeg with the `mozjpeg` feature.
#[derive(Debug, Default, Clone, Copy)]
pub struct JpegCompressor;

impl RasterEncoder for JpegCompressor {
    fn content_type(&self) -> &'static str {
        JPEG_CONTENT_TYPE
    }

    fn encode(&self, img: &DynamicImage, quality: u8) -> Result<Bytes, ProcessingError> {
        // JPEG has no alpha channel; transparent pixels keep their color values
        let rgb_img = img.to_rgb8();
        Self::compress_rgb(&rgb_img, quality.clamp(1, 100))
    }
}

impl JpegCompressor {
    #[cfg(not(feature = "mozjpeg"))]
    fn compress_rgb(rgb_img: &RgbImage, quality: u8) -> Result<Bytes, ProcessingError> {
        let (width, height) = rgb_img.dimensions();
        let estimated_size = (width as usize * height as usize) / 4;
        let mut buffer = Vec::with_capacity(estimated_size);

        let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality);
        encoder
            .encode_image(rgb_img)
            .map_err(|e| ProcessingError::Encode(e.to_string()))?;

        Ok(Bytes::from(buffer))
    }

    /// Compress to JPEG using mozjpeg
    #[cfg(feature = "mozjpeg")]
    fn compress_rgb(rgb_img: &RgbImage, quality: u8) -> Result<Bytes, ProcessingError> {
        let (width, height) = rgb_img.dimensions();

        let mut comp = mozjpeg::Compress::new(mozjpeg::ColorSpace::JCS_RGB);
        comp.set_size(width as usize, height as usize);
        comp.set_quality(quality as f32);
        comp.set_progressive_mode();
        comp.set_optimize_coding(true);

        let mut comp = comp
            .start_compress(Vec::new())
            .map_err(|e| ProcessingError::Encode(e.to_string()))?;
        comp.write_scanlines(rgb_img.as_raw())
            .map_err(|e| ProcessingError::Encode(e.to_string()))?;
        let jpeg_data = comp
            .finish()
            .map_err(|e| ProcessingError::Encode(e.to_string()))?;

        Ok(Bytes::from(jpeg_data))
    }
}
