//! Text-producing generation calls

use crate::error::{AppError, Result};
use crate::remote::traits::RemoteGeneration;
use crate::remote::types::{GenerationConfig, GenerationPart, GenerationRequest, InlineData};

/// Generate text from a prompt and an optional image.
///
/// Returns the first text part of the first candidate.
pub async fn generate_text(
    remote: &dyn RemoteGeneration,
    model: &str,
    prompt: &str,
    image: Option<InlineData>,
    config: GenerationConfig,
) -> Result<String> {
    let mut parts = vec![GenerationPart::text(prompt)];
    if let Some(image) = image {
        parts.push(GenerationPart::InlineBinary(image));
    }

    let request = GenerationRequest::new(parts).with_config(config);
    let response = remote.generate(model, &request).await?;

    response
        .first_text()
        .map(str::to_string)
        .ok_or_else(|| {
            AppError::transport("Unexpected response format: no text part in first candidate")
        })
}
