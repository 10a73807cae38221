//! Gray-world automatic white balance.

use crate::pipeline::clamp_channel;
use crate::pipeline::decode::RasterBuffer;

/// Mean R, G, B over all pixels, or `None` for an empty raster
pub fn channel_means(image: &RasterBuffer) -> Option<[f64; 3]> {
    let count = u64::from(image.width()) * u64::from(image.height());
    if count == 0 {
        return None;
    }

    let mut sums = [0u64; 3];
    for pixel in image.pixels() {
        for (sum, &value) in sums.iter_mut().zip(&pixel.0[..3]) {
            *sum += u64::from(value);
        }
    }

    Some(sums.map(|sum| sum as f64 / count as f64))
}

/// Scale each color channel so its mean matches the mean of the three
/// channel means. A channel with mean 0 keeps a factor of 1.0. Alpha is
/// left alone.
pub fn auto_white_balance(image: &mut RasterBuffer) {
    let Some(means) = channel_means(image) else {
        return;
    };

    let gray = means.iter().sum::<f64>() / 3.0;
    let factors = means.map(|mean| if mean > 0.0 { gray / mean } else { 1.0 });

    for pixel in image.pixels_mut() {
        for (value, factor) in pixel.0[..3].iter_mut().zip(factors) {
            *value = clamp_channel(f64::from(*value) * factor);
        }
    }
}
