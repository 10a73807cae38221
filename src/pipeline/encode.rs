//! JPEG encoding under a byte-size ceiling.

use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};
use tracing::debug;

use crate::error::{AppError, Result};
use crate::pipeline::decode::RasterBuffer;

/// Fixed output encoding of the pipeline
pub const OUTPUT_MIME_TYPE: &str = "image/jpeg";

/// Quality search parameters, all qualities in `(0, 1]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodeOptions {
    pub initial_quality: f32,
    pub min_quality: f32,
    pub quality_step: f32,
    pub max_bytes: usize,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            initial_quality: 0.8,
            min_quality: 0.4,
            quality_step: 0.1,
            max_bytes: 1200 * 1024,
        }
    }
}

/// Result of [`encode_with_ceiling`]
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub quality: f32,
    pub within_ceiling: bool,
}

fn quality_percent(quality: f32) -> u8 {
    (quality * 100.0).round().clamp(1.0, 100.0) as u8
}

/// Drop alpha; JPEG has no alpha channel.
fn flatten(image: &RasterBuffer) -> RgbImage {
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b, _] = image.get_pixel(x, y).0;
        Rgb([r, g, b])
    })
}

fn encode_rgb(image: &RgbImage, quality: u8) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    {
        let mut encoder = JpegEncoder::new_with_quality(&mut bytes, quality);
        encoder
            .encode_image(image)
            .map_err(|e| AppError::Encode(e.to_string()))?;
    }
    Ok(bytes)
}

/// Encode once at `quality`
pub fn encode_jpeg(image: &RasterBuffer, quality: f32) -> Result<Vec<u8>> {
    encode_rgb(&flatten(image), quality_percent(quality))
}

/// Encode starting at `initial_quality`, stepping down until the output
/// fits `max_bytes` or the next step would drop below `min_quality`.
///
/// When nothing fits, the encoding at the lowest quality tried is returned
/// with `within_ceiling == false`.
pub fn encode_with_ceiling(image: &RasterBuffer, options: &EncodeOptions) -> Result<EncodedImage> {
    let rgb = flatten(image);
    let floor = quality_percent(options.min_quality);
    let step = quality_percent(options.quality_step).max(1);
    let mut quality = quality_percent(options.initial_quality).max(floor);

    loop {
        let bytes = encode_rgb(&rgb, quality)?;
        debug!(quality, size = bytes.len(), ceiling = options.max_bytes, "Encoded JPEG");

        let within_ceiling = bytes.len() <= options.max_bytes;
        match quality.checked_sub(step) {
            Some(next) if !within_ceiling && next >= floor => quality = next,
            _ => {
                return Ok(EncodedImage {
                    bytes,
                    quality: f32::from(quality) / 100.0,
                    within_ceiling,
                })
            }
        }
    }
}
