//! Credential-holding relay for generation calls
//!
//! Accepts `{endpoint, payload}`, appends the server-side key and forwards the
//! payload upstream. Upstream status codes pass through unchanged.

use axum::{
    body::Bytes,
    extract::State,
    http::{header::CONTENT_TYPE, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, error, info, warn};

use crate::config::RelayConfig;
use crate::error::{AppError, Result};

/// Longest upstream error body kept in logs
const LOGGED_ERROR_CHARS: usize = 500;

#[derive(Debug, Default, Deserialize)]
struct RelayRequest {
    #[serde(default)]
    endpoint: Option<String>,
    #[serde(default)]
    payload: Option<Value>,
}

/// Upstream forwarder shared by relay handlers
pub struct Relay {
    client: Client,
    upstream_base_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl Relay {
    pub fn new(config: &RelayConfig, api_key: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            upstream_base_url: config.upstream_base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            timeout: Duration::from_millis(config.upstream_timeout_ms),
        })
    }

    /// Forward one request body and build the relay's reply
    pub async fn forward(&self, body: &[u8]) -> Response {
        let request: RelayRequest = serde_json::from_slice(body).unwrap_or_default();

        let (endpoint, payload) = match (request.endpoint, request.payload) {
            (Some(endpoint), Some(payload)) if !endpoint.is_empty() && !payload.is_null() => {
                (endpoint, payload)
            }
            _ => {
                warn!("Relay request missing endpoint or payload");
                return reply(
                    StatusCode::BAD_REQUEST,
                    json!({ "error": "Missing endpoint or payload" }),
                );
            }
        };

        let Some(api_key) = self.api_key.as_deref() else {
            error!("Relay has no API key configured");
            return reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({
                    "error": "API key not configured",
                    "hint": "Set GEMINI_API_KEY or TRYON__REMOTE__API_KEY on the server",
                }),
            );
        };

        let url = format!("{}/{}", self.upstream_base_url, endpoint.trim_start_matches('/'));
        debug!(url = %url, "Forwarding relay request");

        let started = Instant::now();
        match tokio::time::timeout(self.timeout, self.send(&url, api_key, &payload)).await {
            Ok(Ok((status, upstream))) => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                match upstream {
                    Upstream::Json(data) => {
                        info!(elapsed_ms, "Relay request succeeded");
                        reply(StatusCode::OK, data)
                    }
                    Upstream::Error(text) => {
                        warn!(
                            status = status.as_u16(),
                            elapsed_ms,
                            body = %text.chars().take(LOGGED_ERROR_CHARS).collect::<String>(),
                            "Upstream returned an error"
                        );
                        reply(status, json!({ "error": text, "status": status.as_u16() }))
                    }
                }
            }
            Ok(Err(e)) if e.is_timeout() => timeout_reply(),
            Ok(Err(e)) => {
                error!(error = %e, "Relay request failed");
                reply(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal server error", "details": e.to_string() }),
                )
            }
            Err(_) => timeout_reply(),
        }
    }

    async fn send(
        &self,
        url: &str,
        api_key: &str,
        payload: &Value,
    ) -> std::result::Result<(StatusCode, Upstream), reqwest::Error> {
        let response = self
            .client
            .post(url)
            .query(&[("key", api_key)])
            .json(payload)
            .send()
            .await?;

        let status =
            StatusCode::from_u16(response.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
        if !status.is_success() {
            return Ok((status, Upstream::Error(response.text().await?)));
        }

        Ok((status, Upstream::Json(response.json().await?)))
    }
}

enum Upstream {
    Json(Value),
    Error(String),
}

fn reply(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

fn timeout_reply() -> Response {
    warn!("Relay request timed out");
    reply(StatusCode::REQUEST_TIMEOUT, json!({ "error": "Request timeout" }))
}

async fn relay_handler(State(relay): State<Arc<Relay>>, body: Bytes) -> Response {
    relay.forward(&body).await
}

/// Relay routes with permissive CORS: `/api/geminiHandler` and `/api/gemini`
pub fn router(relay: Arc<Relay>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE]);

    Router::new()
        .route("/api/geminiHandler", post(relay_handler))
        .route("/api/gemini", post(relay_handler))
        .layer(cors)
        .with_state(relay)
}
