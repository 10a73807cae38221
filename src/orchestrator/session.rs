//! Per-invocation record of try-on attempts

use chrono::{DateTime, Utc};

/// How one attempt ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The remote returned an inline image
    Image,
    /// The call failed or returned no image
    Failed(String),
}

/// Result of comparing a returned image against the user image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validation {
    Passed,
    /// The model echoed the input back
    Failed,
    /// No image to validate
    Skipped,
}

/// One request/response cycle
#[derive(Debug, Clone)]
pub struct GenerationAttempt {
    /// Zero-based attempt index
    pub index: u32,
    pub prompt: String,
    pub outcome: AttemptOutcome,
    pub validation: Validation,
    pub finished_at: DateTime<Utc>,
}

/// Ordered attempts of one orchestrator invocation.
///
/// Never holds more than `max_retries + 1` entries.
#[derive(Debug, Clone)]
pub struct RetrySession {
    max_retries: u32,
    attempts: Vec<GenerationAttempt>,
    started_at: DateTime<Utc>,
}

impl RetrySession {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            attempts: Vec::with_capacity(max_retries as usize + 1),
            started_at: Utc::now(),
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Total attempts permitted
    pub fn budget(&self) -> u32 {
        self.max_retries + 1
    }

    pub fn attempts(&self) -> &[GenerationAttempt] {
        &self.attempts
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempts.len() as u32 >= self.budget()
    }

    pub(crate) fn record(
        &mut self,
        index: u32,
        prompt: String,
        outcome: AttemptOutcome,
        validation: Validation,
    ) {
        if self.is_exhausted() {
            return;
        }
        self.attempts.push(GenerationAttempt {
            index,
            prompt,
            outcome,
            validation,
            finished_at: Utc::now(),
        });
    }
}
