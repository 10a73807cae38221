//! Decoding input bytes into an RGBA raster.

use image::RgbaImage;

use crate::error::{AppError, Result};

/// Width x height grid of 8-bit RGBA samples
pub type RasterBuffer = RgbaImage;

/// Decode raw image bytes (JPEG, PNG, WebP, BMP, GIF) into a [`RasterBuffer`].
///
/// # Errors
///
/// Returns [`AppError::Decode`] if `bytes` is empty or not a supported raster format.
pub fn decode(bytes: &[u8]) -> Result<RasterBuffer> {
    if bytes.is_empty() {
        return Err(AppError::Decode("empty input".to_string()));
    }

    let img = image::load_from_memory(bytes).map_err(|e| AppError::Decode(e.to_string()))?;
    Ok(img.to_rgba8())
}

/// MIME type of encoded image bytes, if recognizable
pub fn sniff_mime_type(bytes: &[u8]) -> Option<&'static str> {
    image::guess_format(bytes).ok().map(|format| format.to_mime_type())
}
