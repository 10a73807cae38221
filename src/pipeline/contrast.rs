//! Histogram-based contrast stretching.

use crate::pipeline::clamp_channel;
use crate::pipeline::decode::RasterBuffer;

/// Share of pixel mass discarded at each end of the histogram
pub const OUTLIER_FRACTION: f64 = 0.01;

/// Rec. 601 luma rounded to a histogram bin
pub fn luminance(r: u8, g: u8, b: u8) -> usize {
    let y = 0.299 * f64::from(r) + 0.587 * f64::from(g) + 0.114 * f64::from(b);
    (y.round() as usize).min(255)
}

pub fn luminance_histogram(image: &RasterBuffer) -> [u64; 256] {
    let mut histogram = [0u64; 256];
    for pixel in image.pixels() {
        let [r, g, b, _] = pixel.0;
        histogram[luminance(r, g, b)] += 1;
    }
    histogram
}

/// Lowest and highest luminance bins after dropping [`OUTLIER_FRACTION`]
/// of the pixel mass from each end.
pub fn luminance_bounds(histogram: &[u64; 256]) -> (usize, usize) {
    let total: u64 = histogram.iter().sum();
    let cutoff = total as f64 * OUTLIER_FRACTION;

    let mut min_lum = None;
    let mut max_lum = 255;
    let mut cumulative = 0u64;

    for (bin, &count) in histogram.iter().enumerate() {
        cumulative += count;
        if min_lum.is_none() && cumulative as f64 > cutoff {
            min_lum = Some(bin);
        }
        if cumulative as f64 > total as f64 - cutoff {
            max_lum = bin;
            break;
        }
    }

    (min_lum.unwrap_or(0), max_lum)
}

/// Stretch RGB from `[min_lum, max_lum]` to `[0, 255]`, then scale around
/// 128 by `factor`.
///
/// Returns `false` without touching the raster when the luminance range
/// is empty (flat image).
pub fn enhance_contrast(image: &mut RasterBuffer, factor: f32) -> bool {
    if image.width() == 0 || image.height() == 0 {
        return false;
    }

    let (min_lum, max_lum) = luminance_bounds(&luminance_histogram(image));
    if max_lum <= min_lum {
        return false;
    }

    let min = min_lum as f64;
    let range = (max_lum - min_lum) as f64;
    let factor = f64::from(factor);

    for pixel in image.pixels_mut() {
        for value in pixel.0[..3].iter_mut() {
            let stretched = (f64::from(*value) - min) / range * 255.0;
            *value = clamp_channel(128.0 + (stretched - 128.0) * factor);
        }
    }

    true
}
