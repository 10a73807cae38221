//! Garment source normalization
//!
//! A garment arrives either as a URL or as an uploaded file. Both resolve to
//! the same [`GarmentFile`] before any pipeline work, so nothing downstream
//! can tell them apart.

use reqwest::{header::CONTENT_TYPE, Client};
use std::time::Duration;
use tracing::debug;

use crate::error::{AppError, Result};
use crate::pipeline::sniff_mime_type;

/// Filename given to garments fetched from a URL
pub const DEFAULT_GARMENT_FILENAME: &str = "garment.jpg";

/// MIME type assumed when a fetch carries no image Content-Type and the
/// bytes are not a recognized format
pub const DEFAULT_GARMENT_MIME: &str = "image/jpeg";

/// Where a garment image comes from
#[derive(Debug, Clone)]
pub enum GarmentSource {
    Url(String),
    Upload {
        bytes: Vec<u8>,
        mime_type: String,
        filename: Option<String>,
    },
}

/// Raw garment bytes with their declared type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GarmentFile {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub filename: String,
}

/// Resolves garment sources, fetching URLs over HTTP
#[derive(Clone)]
pub struct GarmentFetcher {
    client: Client,
}

impl GarmentFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    pub async fn resolve(&self, source: GarmentSource) -> Result<GarmentFile> {
        match source {
            GarmentSource::Url(url) => self.fetch(&url).await,
            GarmentSource::Upload {
                bytes,
                mime_type,
                filename,
            } => Ok(GarmentFile {
                bytes,
                mime_type,
                filename: filename.unwrap_or_else(|| DEFAULT_GARMENT_FILENAME.to_string()),
            }),
        }
    }

    async fn fetch(&self, url: &str) -> Result<GarmentFile> {
        debug!(url = %url, "Fetching garment image");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Transport {
                status: Some(status.as_u16()),
                message: format!("Failed to fetch garment image from {}", url),
            });
        }

        let declared = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(|v| v.trim().to_ascii_lowercase())
            .filter(|v| v.starts_with("image/"));

        let bytes = response.bytes().await?.to_vec();

        // Non-image labels fall back to the bytes themselves
        let mime_type = declared
            .or_else(|| sniff_mime_type(&bytes).map(str::to_string))
            .unwrap_or_else(|| DEFAULT_GARMENT_MIME.to_string());
        debug!(size = bytes.len(), mime_type = %mime_type, "Garment image fetched");

        Ok(GarmentFile {
            bytes,
            mime_type,
            filename: DEFAULT_GARMENT_FILENAME.to_string(),
        })
    }
}
