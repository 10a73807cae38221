//! Provider calls delegated to the credential-holding relay

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use crate::config::RemoteConfig;
use crate::error::{AppError, Result};
use crate::remote::traits::{endpoint_for, RemoteGeneration};
use crate::remote::types::{GenerationRequest, GenerationResponse, WireRequest};
use crate::remote::read_generation_response;

/// Body accepted by the relay endpoint
#[derive(Debug, Serialize)]
pub struct RelayEnvelope<'a> {
    pub endpoint: String,
    pub payload: &'a WireRequest,
}

/// Posts `{endpoint, payload}` to a same-origin relay
pub struct ProxiedRemoteCall {
    client: Client,
    relay_url: String,
}

impl ProxiedRemoteCall {
    /// Create a proxied caller from configuration
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        let relay_url = config.relay_url.clone().ok_or_else(|| {
            AppError::Config(config::ConfigError::Message(
                "Proxied remote mode requires remote.relay_url".to_string(),
            ))
        })?;

        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, relay_url })
    }
}

#[async_trait]
impl RemoteGeneration for ProxiedRemoteCall {
    fn name(&self) -> &str {
        "proxied"
    }

    async fn generate(
        &self,
        model: &str,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse> {
        let payload = request.to_payload();
        let envelope = RelayEnvelope {
            endpoint: endpoint_for(model),
            payload: &payload,
        };

        debug!(
            relay = %self.relay_url,
            endpoint = %envelope.endpoint,
            "Sending proxied generation request"
        );

        let response = self.client.post(&self.relay_url).json(&envelope).send().await?;
        read_generation_response(response).await
    }
}
