//! Progress events reported to callers during preparation and generation
//!
//! Events go through an explicit [`ProgressSink`] handed to each entry point.
//! Logging stays diagnostics-only.

use serde::Serialize;
use tokio::sync::mpsc;

/// Stages of the image preparation pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Decode,
    Resize,
    WhiteBalance,
    Contrast,
    SkinSmoothing,
    Encode,
}

/// A lifecycle point in one preparation or try-on run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    StageStarted { stage: PipelineStage },
    StageFinished { stage: PipelineStage },
    /// Enhancement failed and the original bytes are used instead
    EnhancementSkipped { reason: String },
    AttemptStarted { attempt: u32, total: u32 },
    AttemptFailed { attempt: u32, error: String },
    ValidationResult { attempt: u32, passed: bool },
    RetryScheduled { next_attempt: u32, delay_ms: u64 },
    CleanupStarted,
    CleanupFinished { enhanced: bool },
}

/// Receiver of progress events
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn emit(&self, _event: ProgressEvent) {}
}

impl ProgressSink for mpsc::UnboundedSender<ProgressEvent> {
    fn emit(&self, event: ProgressEvent) {
        // A dropped receiver means nobody is listening any more
        let _ = self.send(event);
    }
}
