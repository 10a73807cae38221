//! End-to-end try-on workflow
//!
//! accept uploads -> prepare user image -> resolve and prepare garment ->
//! retry protocol -> optional enhancement pass

use std::sync::Arc;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::config::{Settings, UploadConfig};
use crate::error::{AppError, Result};
use crate::garment::{GarmentFetcher, GarmentSource};
use crate::orchestrator::{
    EnhancementResult, GarmentInfo, OrchestratorConfig, TryOnOrchestrator, TryOnOutcome,
};
use crate::pipeline::{prepare_for_generation, validate_upload, PipelineConfig, PreparedImage};
use crate::progress::ProgressSink;
use crate::remote::{InlineData, RemoteGeneration};

/// One try-on job
#[derive(Debug, Clone)]
pub struct TryOnRequest {
    pub user_image: Vec<u8>,
    pub user_mime_type: String,
    pub garment: GarmentSource,
    pub garment_info: GarmentInfo,
    /// Overrides `orchestrator.cleanup_enabled` when set
    pub cleanup: Option<bool>,
}

/// Everything produced by one try-on job
#[derive(Debug, Clone)]
pub struct TryOnResult {
    pub session_id: Uuid,
    pub outcome: TryOnOutcome,
    pub enhancement: Option<EnhancementResult>,
}

impl TryOnResult {
    /// Enhanced image when the cleanup pass succeeded, else the try-on image
    pub fn final_image(&self) -> &InlineData {
        match &self.enhancement {
            Some(enhancement) => &enhancement.image,
            None => &self.outcome.image,
        }
    }

    pub fn enhanced(&self) -> bool {
        self.enhancement.as_ref().map_or(false, |e| e.enhanced)
    }
}

/// Owns the orchestrator and the preparation settings
pub struct TryOnService {
    orchestrator: TryOnOrchestrator,
    garments: GarmentFetcher,
    pipeline: PipelineConfig,
    upload: UploadConfig,
    cleanup_enabled: bool,
}

impl TryOnService {
    pub fn new(remote: Arc<dyn RemoteGeneration>, settings: &Settings) -> Result<Self> {
        Ok(Self {
            orchestrator: TryOnOrchestrator::with_config(
                remote,
                OrchestratorConfig::from_settings(settings),
            ),
            garments: GarmentFetcher::new(settings.remote.timeout())?,
            pipeline: PipelineConfig::from(&settings.pipeline),
            upload: settings.upload.clone(),
            cleanup_enabled: settings.orchestrator.cleanup_enabled,
        })
    }

    pub fn orchestrator(&self) -> &TryOnOrchestrator {
        &self.orchestrator
    }

    /// Check type and size, then run the preparation pipeline off the async
    /// executor. A panicking pipeline task surfaces as [`AppError::Internal`].
    pub async fn prepare_upload(
        &self,
        bytes: Vec<u8>,
        mime_type: &str,
        progress: Arc<dyn ProgressSink>,
    ) -> Result<PreparedImage> {
        validate_upload(mime_type, bytes.len(), self.upload.max_file_bytes)?;

        let config = self.pipeline.clone();
        tokio::task::spawn_blocking(move || {
            prepare_for_generation(&bytes, &config, progress.as_ref())
        })
            .await
            .map_err(|e| AppError::Internal(format!("Image preparation task failed: {}", e)))?
    }

    /// Run a complete try-on job
    pub async fn run(
        &self,
        request: TryOnRequest,
        progress: Arc<dyn ProgressSink>,
    ) -> Result<TryOnResult> {
        let session_id = Uuid::new_v4();
        let span = info_span!(
            "tryon",
            session_id = %session_id,
            garment = %request.garment_info.name
        );

        async move {
            let user = self
                .prepare_upload(request.user_image, &request.user_mime_type, progress.clone())
                .await?
                .into_inline();

            let garment_file = self.garments.resolve(request.garment).await?;
            let garment = self
                .prepare_upload(garment_file.bytes, &garment_file.mime_type, progress.clone())
                .await?
                .into_inline();

            let outcome = self
                .orchestrator
                .try_on(&user, &garment, &request.garment_info, progress.as_ref())
                .await?;
            info!(attempt = outcome.attempt, validated = outcome.validated, "Try-on finished");

            let enhancement = if request.cleanup.unwrap_or(self.cleanup_enabled) {
                Some(
                    self.orchestrator
                        .cleanup(
                            &user,
                            &outcome.image,
                            &request.garment_info.name,
                            progress.as_ref(),
                        )
                        .await,
                )
            } else {
                None
            };

            Ok(TryOnResult {
                session_id,
                outcome,
                enhancement,
            })
        }
        .instrument(span)
        .await
    }
}
