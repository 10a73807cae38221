//! Image preparation pipeline
//!
//! Turns an arbitrary user-supplied image into one that is bounded in
//! pixel dimensions and encoded size, with balanced color, stretched
//! contrast and light skin smoothing:
//!
//! decode -> resize -> white balance -> contrast -> skin smoothing -> encode
//!
//! Decode failures are fatal. Any later failure degrades to returning the
//! original input bytes unchanged.

pub mod compress;
pub mod contrast;
pub mod decode;
pub mod encode;
pub mod intake;
pub mod resize;
pub mod skin;
pub mod white_balance;

pub use compress::compress_for_upload;
pub use decode::{decode, sniff_mime_type, RasterBuffer};
pub use encode::{encode_with_ceiling, EncodeOptions, EncodedImage, OUTPUT_MIME_TYPE};
pub use intake::{validate_upload, MAX_UPLOAD_BYTES};
pub use resize::ResizeFilter;

use tracing::{debug, warn};

use crate::config::PipelineSettings;
use crate::error::{AppError, Result};
use crate::progress::{PipelineStage, ProgressEvent, ProgressSink};
use crate::remote::InlineData;

/// Round and clamp a channel value into `0..=255`
pub(crate) fn clamp_channel(value: f64) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// Runtime parameters of the enhancement path
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub max_dimension: u32,
    pub filter: ResizeFilter,
    pub contrast_factor: f32,
    pub skin_smoothing_strength: f32,
    pub encode: EncodeOptions,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_dimension: 800,
            filter: ResizeFilter::default(),
            contrast_factor: 1.1,
            skin_smoothing_strength: 0.3,
            encode: EncodeOptions::default(),
        }
    }
}

impl From<&PipelineSettings> for PipelineConfig {
    fn from(settings: &PipelineSettings) -> Self {
        Self {
            max_dimension: settings.max_dimension,
            filter: ResizeFilter::default(),
            contrast_factor: settings.contrast_factor,
            skin_smoothing_strength: settings.skin_smoothing_strength,
            encode: EncodeOptions {
                initial_quality: settings.initial_quality,
                min_quality: settings.min_quality,
                quality_step: settings.quality_step,
                max_bytes: settings.max_encoded_bytes,
            },
        }
    }
}

/// Output of the pipeline, held for the duration of one request
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
    /// Encoder quality used, `None` for pass-through bytes
    pub quality: Option<f32>,
    /// Whether the enhancement stages were applied
    pub enhanced: bool,
}

impl PreparedImage {
    pub fn byte_size(&self) -> usize {
        self.bytes.len()
    }

    /// The original bytes, used when enhancement fails
    fn passthrough(input: &[u8], width: u32, height: u32) -> Self {
        Self {
            bytes: input.to_vec(),
            mime_type: sniff_mime_type(input)
                .unwrap_or("application/octet-stream")
                .to_string(),
            width,
            height,
            quality: None,
            enhanced: false,
        }
    }

    pub fn into_inline(self) -> InlineData {
        InlineData::new(self.bytes, self.mime_type)
    }
}

/// Run one stage, bracketed by progress events
fn stage<T>(progress: &dyn ProgressSink, stage: PipelineStage, run: impl FnOnce() -> T) -> T {
    progress.emit(ProgressEvent::StageStarted { stage });
    let out = run();
    progress.emit(ProgressEvent::StageFinished { stage });
    out
}

fn enhance_and_encode(
    raster: RasterBuffer,
    config: &PipelineConfig,
    progress: &dyn ProgressSink,
) -> Result<PreparedImage> {
    if raster.width() == 0 || raster.height() == 0 {
        return Err(AppError::Internal("raster has no pixels".to_string()));
    }

    let mut raster = stage(progress, PipelineStage::Resize, || {
        resize::resize_to_fit(raster, config.max_dimension, config.filter)
    });

    stage(progress, PipelineStage::WhiteBalance, || {
        white_balance::auto_white_balance(&mut raster)
    });

    let stretched = stage(progress, PipelineStage::Contrast, || {
        contrast::enhance_contrast(&mut raster, config.contrast_factor)
    });
    if !stretched {
        debug!("Luminance range is flat, contrast stretch skipped");
    }

    let raster = stage(progress, PipelineStage::SkinSmoothing, || {
        skin::smooth_skin(&raster, config.skin_smoothing_strength)
    });

    let encoded = stage(progress, PipelineStage::Encode, || {
        encode::encode_with_ceiling(&raster, &config.encode)
    })?;

    debug!(
        width = raster.width(),
        height = raster.height(),
        size = encoded.bytes.len(),
        quality = encoded.quality,
        within_ceiling = encoded.within_ceiling,
        "Image prepared"
    );

    Ok(PreparedImage {
        bytes: encoded.bytes,
        mime_type: OUTPUT_MIME_TYPE.to_string(),
        width: raster.width(),
        height: raster.height(),
        quality: Some(encoded.quality),
        enhanced: true,
    })
}

/// Prepare an image for upload to the generation model.
///
/// # Errors
///
/// Only [`AppError::Decode`]: enhancement failures fall back to the
/// original bytes and are reported as [`ProgressEvent::EnhancementSkipped`].
/// A panic inside a stage is not caught here; callers running this on a
/// blocking task see it as a join error.
pub fn prepare_for_generation(
    input: &[u8],
    config: &PipelineConfig,
    progress: &dyn ProgressSink,
) -> Result<PreparedImage> {
    let raster = stage(progress, PipelineStage::Decode, || decode(input))?;
    let (width, height) = raster.dimensions();

    match enhance_and_encode(raster, config, progress) {
        Ok(prepared) => Ok(prepared),
        Err(e) => {
            warn!(error = %e, "Image enhancement failed, using original image");
            progress.emit(ProgressEvent::EnhancementSkipped {
                reason: e.to_string(),
            });
            Ok(PreparedImage::passthrough(input, width, height))
        }
    }
}
