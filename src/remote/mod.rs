//! Remote generation module - wire types, strategy trait, direct and proxied callers

pub mod direct;
pub mod proxied;
pub mod text;
pub mod traits;
pub mod types;

pub use direct::DirectRemoteCall;
pub use proxied::ProxiedRemoteCall;
pub use text::generate_text;
pub use traits::{endpoint_for, RemoteGeneration};
pub use types::{
    GenerationConfig, GenerationPart, GenerationRequest, GenerationResponse, InlineData,
};

use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::config::{RemoteConfig, RemoteMode};
use crate::error::{AppError, Result};
use types::WireResponse;

/// Build the configured remote strategy. Selected once, never per call.
pub fn from_settings(config: &RemoteConfig) -> Result<Arc<dyn RemoteGeneration>> {
    let remote: Arc<dyn RemoteGeneration> = match config.mode {
        RemoteMode::Direct => Arc::new(DirectRemoteCall::new(config)?),
        RemoteMode::Proxied => Arc::new(ProxiedRemoteCall::new(config)?),
    };
    info!(
        strategy = remote.name(),
        timeout_ms = config.timeout_ms,
        "Remote generation strategy selected"
    );
    Ok(remote)
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    error: serde_json::Value,
}

/// Turn an HTTP response into a parsed generation response.
///
/// Non-2xx statuses become [`AppError::Transport`] carrying the status and
/// the `error` field of a relay payload when present, else the raw body.
pub(crate) async fn read_generation_response(
    response: reqwest::Response,
) -> Result<GenerationResponse> {
    let status = response.status();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ErrorPayload>(&body) {
            Ok(ErrorPayload { error: serde_json::Value::String(s) }) => s,
            Ok(ErrorPayload { error }) => error.to_string(),
            Err(_) => body,
        };
        return Err(AppError::Transport {
            status: Some(status.as_u16()),
            message,
        });
    }

    let wire: WireResponse = response
        .json()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                AppError::from(e)
            } else {
                AppError::transport(format!("Failed to parse generation response: {}", e))
            }
        })?;

    GenerationResponse::from_wire(wire)
}
