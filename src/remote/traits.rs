//! The remote generation capability seam

use async_trait::async_trait;

use crate::error::Result;
use crate::remote::types::{GenerationRequest, GenerationResponse};

/// Opaque remote model: an ordered list of parts in, candidate part lists out.
///
/// Implementations are chosen once at startup (see [`crate::remote::from_settings`])
/// and must surface deadline expiry as [`crate::AppError::Timeout`].
#[async_trait]
pub trait RemoteGeneration: Send + Sync {
    /// Strategy name, for logs
    fn name(&self) -> &str;

    /// Send one generation turn to `model`
    async fn generate(
        &self,
        model: &str,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse>;
}

/// Provider endpoint path for a model's `generateContent` call
pub fn endpoint_for(model: &str) -> String {
    format!("models/{}:generateContent", model)
}
