//! Configuration module

mod settings;

pub use settings::{
    CompressionSettings, LoggingConfig, OrchestratorSettings, PipelineSettings, RelayConfig,
    RemoteConfig, RemoteMode, ServerConfig, Settings, UploadConfig,
};
