//! Bounding pixel dimensions.
//!
//! Images whose longest side exceeds the configured maximum are scaled
//! down with a smoothing filter. Smaller images are never upscaled.

use image::imageops::{self, FilterType};

use crate::pipeline::decode::RasterBuffer;

/// Resampling filter used when downscaling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResizeFilter {
    /// Bilinear interpolation
    Triangle,
    /// Bicubic (Catmull-Rom)
    #[default]
    CatmullRom,
    /// Lanczos with 3 lobes
    Lanczos3,
}

impl ResizeFilter {
    fn to_image_filter(self) -> FilterType {
        match self {
            Self::Triangle => FilterType::Triangle,
            Self::CatmullRom => FilterType::CatmullRom,
            Self::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Output dimensions for fitting `width x height` within `max_dimension`.
///
/// Returns `None` when no resize is needed. The scale ratio is
/// `min(max/width, max/height)` and each side is rounded independently.
pub fn target_dimensions(width: u32, height: u32, max_dimension: u32) -> Option<(u32, u32)> {
    if width.max(height) <= max_dimension {
        return None;
    }

    let max = f64::from(max_dimension);
    let ratio = (max / f64::from(width)).min(max / f64::from(height));
    let scale = |side: u32| ((f64::from(side) * ratio).round() as u32).clamp(1, max_dimension);

    Some((scale(width), scale(height)))
}

/// Downscale `image` so its longest side is at most `max_dimension`.
pub fn resize_to_fit(
    image: RasterBuffer,
    max_dimension: u32,
    filter: ResizeFilter,
) -> RasterBuffer {
    match target_dimensions(image.width(), image.height(), max_dimension) {
        Some((width, height)) => imageops::resize(&image, width, height, filter.to_image_filter()),
        None => image,
    }
}
