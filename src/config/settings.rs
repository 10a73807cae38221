//! Application settings and configuration management

use crate::error::{AppError, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub remote: RemoteConfig,
    pub relay: RelayConfig,
    pub pipeline: PipelineSettings,
    pub compression: CompressionSettings,
    pub upload: UploadConfig,
    pub orchestrator: OrchestratorSettings,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

/// How outbound generation calls reach the model provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteMode {
    /// Call the provider directly with a locally held credential
    Direct,
    /// Delegate to a relay endpoint that holds the credential
    Proxied,
}

/// Remote generation capability configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RemoteConfig {
    #[serde(default = "default_remote_mode")]
    pub mode: RemoteMode,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub relay_url: Option<String>,
    #[serde(default = "default_image_model")]
    pub image_model: String,
    #[serde(default = "default_text_model")]
    pub text_model: String,
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
}

fn default_remote_mode() -> RemoteMode {
    RemoteMode::Direct
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_image_model() -> String {
    "gemini-2.5-flash-image-preview".to_string()
}

fn default_text_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_timeout() -> u64 {
    55_000
}

impl RemoteConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Relay (credential-forwarding proxy) configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RelayConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_base_url")]
    pub upstream_base_url: String,
    #[serde(default = "default_timeout")]
    pub upstream_timeout_ms: u64,
}

fn default_true() -> bool {
    true
}

/// Enhancement pipeline configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineSettings {
    #[serde(default = "default_max_dimension")]
    pub max_dimension: u32,
    #[serde(default = "default_initial_quality")]
    pub initial_quality: f32,
    #[serde(default = "default_min_quality")]
    pub min_quality: f32,
    #[serde(default = "default_quality_step")]
    pub quality_step: f32,
    #[serde(default = "default_max_encoded_bytes")]
    pub max_encoded_bytes: usize,
    #[serde(default = "default_contrast_factor")]
    pub contrast_factor: f32,
    #[serde(default = "default_skin_strength")]
    pub skin_smoothing_strength: f32,
}

fn default_max_dimension() -> u32 {
    800
}

fn default_initial_quality() -> f32 {
    0.8
}

fn default_min_quality() -> f32 {
    0.4
}

fn default_quality_step() -> f32 {
    0.1
}

fn default_max_encoded_bytes() -> usize {
    1200 * 1024
}

fn default_contrast_factor() -> f32 {
    1.1
}

fn default_skin_strength() -> f32 {
    0.3
}

/// Lightweight compression path, used when enhancement is skipped
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CompressionSettings {
    #[serde(default = "default_compression_dimension")]
    pub max_dimension: u32,
    #[serde(default = "default_compression_quality")]
    pub quality: f32,
    #[serde(default = "default_fallback_quality")]
    pub fallback_quality: f32,
    #[serde(default = "default_compression_bytes")]
    pub max_encoded_bytes: usize,
}

fn default_compression_dimension() -> u32 {
    1280
}

fn default_compression_quality() -> f32 {
    0.75
}

fn default_fallback_quality() -> f32 {
    0.6
}

fn default_compression_bytes() -> usize {
    1536 * 1024
}

/// Upload acceptance configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UploadConfig {
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: usize,
}

fn default_max_file_bytes() -> usize {
    10 * 1024 * 1024
}

/// Retry orchestration configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OrchestratorSettings {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_true")]
    pub cleanup_enabled: bool,
}

fn default_max_retries() -> u32 {
    2
}

fn default_backoff_ms() -> u64 {
    1000
}

fn default_temperature() -> f32 {
    0.5
}

impl Settings {
    /// Load settings from configuration files and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/default.toml")
    }

    /// Load settings from a specific configuration file path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "json")?
            .set_default("remote.mode", "direct")?
            .set_default("relay.enabled", true)?
            .set_default("orchestrator.max_retries", 2)?
            .set_default("orchestrator.backoff_ms", 1000)?
            // Sections are filled in from serde defaults when absent
            .set_default("pipeline.max_dimension", 800)?
            .set_default("compression.max_dimension", 1280)?
            .set_default("upload.max_file_bytes", 10 * 1024 * 1024)?
            .add_source(
                File::with_name(path.as_ref().to_str().unwrap_or("config/default")).required(false),
            )
            // Override with environment variables (prefixed with TRYON_)
            .add_source(
                Environment::with_prefix("TRYON")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut settings: Settings = config.try_deserialize()?;

        if settings.remote.api_key.is_none() {
            settings.remote.api_key = std::env::var("GEMINI_API_KEY")
                .ok()
                .filter(|k| !k.is_empty());
        }

        Ok(settings)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(invalid("Server port cannot be 0"));
        }

        if self.remote.mode == RemoteMode::Proxied && self.remote.relay_url.is_none() {
            return Err(invalid("Proxied remote mode requires remote.relay_url"));
        }

        if self.remote.timeout_ms == 0 {
            return Err(invalid("remote.timeout_ms must be positive"));
        }

        if self.remote.timeout_ms > self.relay.upstream_timeout_ms {
            return Err(invalid(format!(
                "remote.timeout_ms ({}) must not exceed relay.upstream_timeout_ms ({})",
                self.remote.timeout_ms, self.relay.upstream_timeout_ms
            )));
        }

        let p = &self.pipeline;
        if p.max_dimension == 0 || self.compression.max_dimension == 0 {
            return Err(invalid("max_dimension must be positive"));
        }
        for (name, q) in [
            ("pipeline.initial_quality", p.initial_quality),
            ("pipeline.min_quality", p.min_quality),
            ("compression.quality", self.compression.quality),
            ("compression.fallback_quality", self.compression.fallback_quality),
        ] {
            if !(q > 0.0 && q <= 1.0) {
                return Err(invalid(format!("{} must be in (0, 1], got {}", name, q)));
            }
        }
        if p.min_quality > p.initial_quality {
            return Err(invalid("pipeline.min_quality cannot exceed pipeline.initial_quality"));
        }
        if p.quality_step <= 0.0 {
            return Err(invalid("pipeline.quality_step must be positive"));
        }

        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> AppError {
    AppError::Config(config::ConfigError::Message(message.into()))
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
            },
            logging: LoggingConfig {
                level: default_log_level(),
                format: default_log_format(),
            },
            remote: RemoteConfig {
                mode: default_remote_mode(),
                api_key: None,
                base_url: default_base_url(),
                relay_url: None,
                image_model: default_image_model(),
                text_model: default_text_model(),
                timeout_ms: default_timeout(),
            },
            relay: RelayConfig {
                enabled: true,
                upstream_base_url: default_base_url(),
                upstream_timeout_ms: default_timeout(),
            },
            pipeline: PipelineSettings {
                max_dimension: default_max_dimension(),
                initial_quality: default_initial_quality(),
                min_quality: default_min_quality(),
                quality_step: default_quality_step(),
                max_encoded_bytes: default_max_encoded_bytes(),
                contrast_factor: default_contrast_factor(),
                skin_smoothing_strength: default_skin_strength(),
            },
            compression: CompressionSettings {
                max_dimension: default_compression_dimension(),
                quality: default_compression_quality(),
                fallback_quality: default_fallback_quality(),
                max_encoded_bytes: default_compression_bytes(),
            },
            upload: UploadConfig {
                max_file_bytes: default_max_file_bytes(),
            },
            orchestrator: OrchestratorSettings {
                max_retries: default_max_retries(),
                backoff_ms: default_backoff_ms(),
                temperature: default_temperature(),
                cleanup_enabled: true,
            },
        }
    }
}
