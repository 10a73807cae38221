//! Direct provider calls with a locally held credential

use async_trait::async_trait;
use reqwest::Client;
use std::time::Instant;
use tracing::debug;

use crate::config::RemoteConfig;
use crate::error::{AppError, Result};
use crate::remote::traits::{endpoint_for, RemoteGeneration};
use crate::remote::types::{GenerationRequest, GenerationResponse};
use crate::remote::read_generation_response;

/// Calls `{base_url}/models/{model}:generateContent?key=...`
pub struct DirectRemoteCall {
    client: Client,
    base_url: String,
    api_key: String,
}

impl DirectRemoteCall {
    /// Create a direct caller from configuration
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            AppError::Config(config::ConfigError::Message(
                "Direct remote mode requires remote.api_key or GEMINI_API_KEY".to_string(),
            ))
        })?;

        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl RemoteGeneration for DirectRemoteCall {
    fn name(&self) -> &str {
        "direct"
    }

    async fn generate(
        &self,
        model: &str,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse> {
        let url = format!("{}/{}", self.base_url, endpoint_for(model));
        let started = Instant::now();

        debug!(model = %model, parts = request.parts.len(), "Sending direct generation request");

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request.to_payload())
            .send()
            .await?;

        let result = read_generation_response(response).await;
        debug!(
            model = %model,
            elapsed_ms = started.elapsed().as_millis() as u64,
            ok = result.is_ok(),
            "Direct generation request finished"
        );
        result
    }
}
