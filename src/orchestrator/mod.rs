//! Generation orchestrator: the virtual try-on retry protocol
//!
//! Drives the remote capability through up to `max_retries + 1` strictly
//! sequential attempts with escalating instructions, validates each returned
//! image against the user image and selects the final result.

pub mod cleanup;
pub mod prompts;
pub mod session;

pub use cleanup::EnhancementResult;
pub use prompts::{cleanup_prompt, try_on_prompt, GarmentInfo, PromptTier};
pub use session::{AttemptOutcome, GenerationAttempt, RetrySession, Validation};

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::error::{AppError, Result};
use crate::progress::{ProgressEvent, ProgressSink};
use crate::remote::{
    GenerationPart, GenerationRequest, GenerationResponse, InlineData, RemoteGeneration,
};

/// Orchestrator parameters
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Image-producing model name
    pub model: String,
    pub max_retries: u32,
    /// Fixed wait between attempts
    pub backoff: Duration,
    /// Hard deadline of each outbound call
    pub deadline: Duration,
    pub temperature: f32,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash-image-preview".to_string(),
            max_retries: 2,
            backoff: Duration::from_secs(1),
            deadline: Duration::from_secs(55),
            temperature: 0.5,
        }
    }
}

impl OrchestratorConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            model: settings.remote.image_model.clone(),
            max_retries: settings.orchestrator.max_retries,
            backoff: Duration::from_millis(settings.orchestrator.backoff_ms),
            deadline: settings.remote.timeout(),
            temperature: settings.orchestrator.temperature,
        }
    }
}

/// Final result of a try-on run
#[derive(Debug, Clone)]
pub struct TryOnOutcome {
    pub image: InlineData,
    pub prompt_used: String,
    /// One-based number of the attempt that produced `image`
    pub attempt: u32,
    /// False when the image is a last-resort acceptance
    pub validated: bool,
    pub session: RetrySession,
}

impl TryOnOutcome {
    /// Zero-based index of the producing attempt
    pub fn attempt_index(&self) -> u32 {
        self.attempt.saturating_sub(1)
    }
}

/// A returned image that failed validation, kept in case nothing better arrives
struct Unvalidated {
    image: InlineData,
    prompt: String,
    index: u32,
}

/// Runs try-on sessions against one remote strategy.
///
/// Holds no per-invocation state, so one instance serves concurrent requests.
pub struct TryOnOrchestrator {
    remote: Arc<dyn RemoteGeneration>,
    config: OrchestratorConfig,
}

impl TryOnOrchestrator {
    pub fn new(remote: Arc<dyn RemoteGeneration>) -> Self {
        Self::with_config(remote, OrchestratorConfig::default())
    }

    pub fn with_config(remote: Arc<dyn RemoteGeneration>, config: OrchestratorConfig) -> Self {
        Self { remote, config }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// One outbound call bounded by the configured deadline
    async fn dispatch(&self, request: &GenerationRequest) -> Result<GenerationResponse> {
        let call = self.remote.generate(&self.config.model, request);
        match tokio::time::timeout(self.config.deadline, call).await {
            Ok(result) => result,
            Err(_) => Err(AppError::Timeout(format!(
                "Generation call exceeded {} ms",
                self.config.deadline.as_millis()
            ))),
        }
    }

    /// Dispatch and pull out the first inline image of the first candidate
    async fn attempt_image(&self, request: &GenerationRequest) -> Result<InlineData> {
        let response = self.dispatch(request).await?;
        response.first_inline_binary().cloned().ok_or(AppError::NoCandidateImage)
    }

    /// Run the retry protocol.
    ///
    /// `user` and `garment_image` must already be prepared. Per-attempt
    /// failures are retried; only exhaustion without any image, or a
    /// non-retryable error, is returned as `Err`.
    pub async fn try_on(
        &self,
        user: &InlineData,
        garment_image: &InlineData,
        garment: &GarmentInfo,
        progress: &dyn ProgressSink,
    ) -> Result<TryOnOutcome> {
        let max_retries = self.config.max_retries;
        let mut session = RetrySession::new(max_retries);
        let total = session.budget();
        let mut last_error: Option<AppError> = None;
        let mut unvalidated: Option<Unvalidated> = None;

        for index in 0..=max_retries {
            let number = index + 1;
            let prompt = try_on_prompt(index, garment);
            progress.emit(ProgressEvent::AttemptStarted { attempt: number, total });
            info!(attempt = number, total, garment = %garment.name, "Virtual try-on attempt");

            let request = GenerationRequest::new(vec![
                GenerationPart::text(prompt.clone()),
                GenerationPart::InlineBinary(user.clone()),
                GenerationPart::InlineBinary(garment_image.clone()),
            ])
            .with_temperature(self.config.temperature);

            match self.attempt_image(&request).await {
                Ok(image) => {
                    // Byte-identical output means the model returned the input unchanged
                    let passed = image.data != user.data;
                    progress.emit(ProgressEvent::ValidationResult { attempt: number, passed });
                    session.record(
                        index,
                        prompt.clone(),
                        AttemptOutcome::Image,
                        if passed { Validation::Passed } else { Validation::Failed },
                    );

                    if passed || index == max_retries {
                        if !passed {
                            warn!(
                                attempt = number,
                                "Accepting unvalidated result on final attempt"
                            );
                        }
                        return Ok(TryOnOutcome {
                            image,
                            prompt_used: prompt,
                            attempt: number,
                            validated: passed,
                            session,
                        });
                    }

                    warn!(
                        attempt = number,
                        "Result identical to input, no clothing change detected"
                    );
                    unvalidated = Some(Unvalidated { image, prompt, index });
                }
                Err(e) => {
                    warn!(attempt = number, error = %e, "Try-on attempt failed");
                    progress.emit(ProgressEvent::AttemptFailed {
                        attempt: number,
                        error: e.to_string(),
                    });
                    session.record(
                        index,
                        prompt,
                        AttemptOutcome::Failed(e.to_string()),
                        Validation::Skipped,
                    );

                    if !e.is_retryable() {
                        return Err(e);
                    }
                    last_error = Some(e);
                }
            }

            if index < max_retries {
                let delay_ms = self.config.backoff.as_millis() as u64;
                progress.emit(ProgressEvent::RetryScheduled {
                    next_attempt: number + 1,
                    delay_ms,
                });
                debug!(delay_ms, "Waiting before next attempt");
                tokio::time::sleep(self.config.backoff).await;
            }
        }

        if let Some(fallback) = unvalidated {
            warn!(
                attempt = fallback.index + 1,
                "Final attempt failed, returning earlier unvalidated result"
            );
            return Ok(TryOnOutcome {
                image: fallback.image,
                prompt_used: fallback.prompt,
                attempt: fallback.index + 1,
                validated: false,
                session,
            });
        }

        Err(last_error.unwrap_or(AppError::AllAttemptsFailed))
    }

    /// Single-attempt enhancement of a try-on result. Never fails.
    pub async fn cleanup(
        &self,
        original: &InlineData,
        try_on: &InlineData,
        garment_name: &str,
        progress: &dyn ProgressSink,
    ) -> EnhancementResult {
        progress.emit(ProgressEvent::CleanupStarted);

        let request = GenerationRequest::new(vec![
            GenerationPart::text(cleanup_prompt(garment_name)),
            GenerationPart::InlineBinary(original.clone()),
            GenerationPart::InlineBinary(try_on.clone()),
        ])
        .with_temperature(self.config.temperature);

        let result = match self.attempt_image(&request).await {
            Ok(image) => {
                info!("Enhancement pass completed");
                EnhancementResult::enhanced(image)
            }
            Err(e) => {
                warn!(error = %e, "Enhancement pass failed, keeping try-on result");
                EnhancementResult::unchanged(try_on.clone(), e)
            }
        };

        progress.emit(ProgressEvent::CleanupFinished {
            enhanced: result.enhanced,
        });
        result
    }
}
