//! Heuristic skin-tone smoothing.
//!
//! Interior pixels whose normalized RGB shares look like skin are blended
//! toward their 3x3 neighborhood mean. Border pixels and everything else
//! keep their original values. The thresholds are intentionally crude.

use crate::pipeline::clamp_channel;
use crate::pipeline::decode::RasterBuffer;

/// Skin classification on normalized RGB shares
pub fn is_skin_tone(r: u8, g: u8, b: u8) -> bool {
    let total = u32::from(r) + u32::from(g) + u32::from(b);
    if total == 0 {
        return false;
    }

    let total = f64::from(total);
    let r_share = f64::from(r) / total;
    let g_share = f64::from(g) / total;
    let b_share = f64::from(b) / total;

    r_share > 0.35
        && r_share < 0.55
        && g_share > 0.25
        && g_share < 0.45
        && b_share > 0.15
        && b_share < 0.35
        && r > b
        && g > b
}

/// Mean RGB of the 3x3 block centered on an interior pixel
pub fn neighborhood_mean(image: &RasterBuffer, x: u32, y: u32) -> [f64; 3] {
    let mut sums = [0u32; 3];
    for ny in y - 1..=y + 1 {
        for nx in x - 1..=x + 1 {
            let pixel = image.get_pixel(nx, ny);
            for (sum, &value) in sums.iter_mut().zip(&pixel.0[..3]) {
                *sum += u32::from(value);
            }
        }
    }
    sums.map(|sum| f64::from(sum) / 9.0)
}

/// Blend skin pixels toward their local mean by `strength`.
///
/// Classification and neighborhoods read the input, so earlier writes
/// never feed later pixels.
pub fn smooth_skin(image: &RasterBuffer, strength: f32) -> RasterBuffer {
    let mut result = image.clone();
    let (width, height) = image.dimensions();
    if width < 3 || height < 3 {
        return result;
    }

    let strength = f64::from(strength);

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let [r, g, b, _] = image.get_pixel(x, y).0;
            if !is_skin_tone(r, g, b) {
                continue;
            }

            let mean = neighborhood_mean(image, x, y);
            let out = result.get_pixel_mut(x, y);
            for ((value, original), target) in out.0[..3].iter_mut().zip([r, g, b]).zip(mean) {
                let original = f64::from(original);
                *value = clamp_channel(original + (target - original) * strength);
            }
        }
    }

    result
}
