//! Lightweight compression path, used when enhancement is skipped.
//!
//! Resizes to a larger bound than the enhancement path and makes a
//! single lower-quality retry when the first encoding is too big.

use tracing::debug;

use crate::config::CompressionSettings;
use crate::error::Result;
use crate::pipeline::decode::decode;
use crate::pipeline::encode::{encode_jpeg, OUTPUT_MIME_TYPE};
use crate::pipeline::resize::{resize_to_fit, ResizeFilter};
use crate::pipeline::PreparedImage;

/// Resize to `max_dimension` and JPEG-encode at `quality`, retrying once
/// at `fallback_quality` if the result exceeds `max_encoded_bytes`.
pub fn compress_for_upload(input: &[u8], settings: &CompressionSettings) -> Result<PreparedImage> {
    let raster = resize_to_fit(decode(input)?, settings.max_dimension, ResizeFilter::default());
    let (width, height) = raster.dimensions();

    let mut quality = settings.quality;
    let mut bytes = encode_jpeg(&raster, quality)?;

    if bytes.len() > settings.max_encoded_bytes {
        debug!(
            size = bytes.len(),
            limit = settings.max_encoded_bytes,
            "Retrying compression at fallback quality"
        );
        quality = settings.fallback_quality;
        bytes = encode_jpeg(&raster, quality)?;
    }

    Ok(PreparedImage {
        bytes,
        mime_type: OUTPUT_MIME_TYPE.to_string(),
        width,
        height,
        quality: Some(quality),
        enhanced: false,
    })
}
