//! Request handlers and their JSON shapes

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header::CONTENT_TYPE, HeaderMap},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::error::{AppError, Result};
use crate::garment::GarmentSource;
use crate::orchestrator::{AttemptOutcome, GarmentInfo, Validation};
use crate::pipeline::{compress_for_upload, sniff_mime_type, validate_upload, PreparedImage};
use crate::progress::NoopProgress;
use crate::remote::InlineData;
use crate::response::base64;
use crate::service::{TryOnRequest, TryOnResult};
use crate::stylist::StyleRecommendations;
use crate::AppState;

/// Health response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub remote: String,
    pub relay_enabled: bool,
    pub timestamp: DateTime<Utc>,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        remote: state.remote.name().to_string(),
        relay_enabled: state.relay.is_some(),
        timestamp: Utc::now(),
    })
}

/// Body of `POST /v1/tryon`. Images are base64 or data URLs.
#[derive(Debug, Deserialize)]
pub struct TryOnBody {
    pub user_image: String,
    #[serde(default)]
    pub user_mime_type: Option<String>,
    #[serde(default)]
    pub garment_url: Option<String>,
    #[serde(default)]
    pub garment_image: Option<String>,
    #[serde(default)]
    pub garment_mime_type: Option<String>,
    pub garment_name: String,
    #[serde(default = "default_category")]
    pub garment_category: String,
    #[serde(default)]
    pub cleanup: Option<bool>,
}

fn default_category() -> String {
    "clothing".to_string()
}

#[derive(Debug, Serialize)]
pub struct AttemptSummary {
    pub attempt: u32,
    pub succeeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub validated: Option<bool>,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct TryOnResponse {
    pub session_id: String,
    /// Final image as a data URL
    pub image: String,
    pub mime_type: String,
    pub prompt: String,
    pub attempt: u32,
    pub validated: bool,
    pub enhanced: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enhancement_error: Option<String>,
    pub attempts: Vec<AttemptSummary>,
}

impl From<TryOnResult> for TryOnResponse {
    fn from(result: TryOnResult) -> Self {
        let image = result.final_image().clone();
        let enhanced = result.enhanced();
        let attempts = result
            .outcome
            .session
            .attempts()
            .iter()
            .map(|a| {
                let (succeeded, error) = match &a.outcome {
                    AttemptOutcome::Image => (true, None),
                    AttemptOutcome::Failed(e) => (false, Some(e.clone())),
                };
                AttemptSummary {
                    attempt: a.index + 1,
                    succeeded,
                    error,
                    validated: match a.validation {
                        Validation::Passed => Some(true),
                        Validation::Failed => Some(false),
                        Validation::Skipped => None,
                    },
                    finished_at: a.finished_at,
                }
            })
            .collect();

        Self {
            session_id: result.session_id.to_string(),
            image: base64::create_data_url(&image.data, &image.mime_type),
            mime_type: image.mime_type,
            prompt: result.outcome.prompt_used,
            attempt: result.outcome.attempt,
            validated: result.outcome.validated,
            enhanced,
            enhancement_error: result.enhancement.and_then(|e| e.error),
            attempts,
        }
    }
}

/// Decode a base64 image and settle its MIME type: explicit value, then the
/// data-URL prefix, then content sniffing.
fn decode_image(encoded: &str, declared: Option<&str>) -> Result<(Vec<u8>, String)> {
    let bytes = base64::decode(encoded)?;
    let mime_type = declared
        .or_else(|| base64::mime_from_data_url(encoded))
        .or_else(|| sniff_mime_type(&bytes))
        .unwrap_or("application/octet-stream")
        .to_string();
    Ok((bytes, mime_type))
}

pub async fn try_on(
    State(state): State<Arc<AppState>>,
    Json(body): Json<TryOnBody>,
) -> Result<Json<TryOnResponse>> {
    let (user_image, user_mime_type) =
        decode_image(&body.user_image, body.user_mime_type.as_deref())?;

    let garment = match (body.garment_image, body.garment_url) {
        (Some(encoded), _) => {
            let (bytes, mime_type) = decode_image(&encoded, body.garment_mime_type.as_deref())?;
            GarmentSource::Upload {
                bytes,
                mime_type,
                filename: None,
            }
        }
        (None, Some(url)) => GarmentSource::Url(url),
        (None, None) => {
            return Err(AppError::InvalidRequest(
                "Either garment_image or garment_url is required".to_string(),
            ))
        }
    };

    let request = TryOnRequest {
        user_image,
        user_mime_type,
        garment,
        garment_info: GarmentInfo::new(body.garment_name, body.garment_category),
        cleanup: body.cleanup,
    };

    let result = state.service.run(request, Arc::new(NoopProgress)).await?;
    info!(
        session_id = %result.session_id,
        attempt = result.outcome.attempt,
        validated = result.outcome.validated,
        enhanced = result.enhanced(),
        "Try-on request completed"
    );

    Ok(Json(result.into()))
}

/// Query of `POST /v1/images/prepare`
#[derive(Debug, Default, Deserialize)]
pub struct PrepareQuery {
    /// `enhance` (default) or `compress`
    #[serde(default)]
    pub mode: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PrepareResponse {
    pub image: String,
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
    pub size: usize,
    pub quality: Option<f32>,
    pub enhanced: bool,
}

impl From<PreparedImage> for PrepareResponse {
    fn from(prepared: PreparedImage) -> Self {
        Self {
            image: base64::create_data_url(&prepared.bytes, &prepared.mime_type),
            size: prepared.byte_size(),
            mime_type: prepared.mime_type,
            width: prepared.width,
            height: prepared.height,
            quality: prepared.quality,
            enhanced: prepared.enhanced,
        }
    }
}

/// Raw image body in, prepared image out
pub async fn prepare_image(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PrepareQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<PrepareResponse>> {
    let mime_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| sniff_mime_type(&body).map(str::to_string))
        .unwrap_or_default();

    let prepared = match query.mode.as_deref() {
        None | Some("enhance") => {
            state
                .service
                .prepare_upload(body.to_vec(), &mime_type, Arc::new(NoopProgress))
                .await?
        }
        Some("compress") => {
            validate_upload(&mime_type, body.len(), state.settings.upload.max_file_bytes)?;
            let compression = state.settings.compression.clone();
            tokio::task::spawn_blocking(move || compress_for_upload(&body, &compression))
                .await
                .map_err(|e| AppError::Internal(format!("Compression task failed: {}", e)))??
        }
        Some(other) => {
            return Err(AppError::InvalidRequest(format!("Unknown preparation mode: {}", other)));
        }
    };

    Ok(Json(prepared.into()))
}

/// Body of `POST /v1/style/recommendations`
#[derive(Debug, Deserialize)]
pub struct StyleBody {
    pub garment_image: String,
    #[serde(default)]
    pub mime_type: Option<String>,
}

pub async fn style_recommendations(
    State(state): State<Arc<AppState>>,
    Json(body): Json<StyleBody>,
) -> Result<Json<StyleRecommendations>> {
    let (bytes, mime_type) = decode_image(&body.garment_image, body.mime_type.as_deref())?;
    validate_upload(&mime_type, bytes.len(), state.settings.upload.max_file_bytes)?;

    Ok(Json(state.stylist.recommend(InlineData::new(bytes, mime_type)).await))
}
