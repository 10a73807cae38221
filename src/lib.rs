//! Virtual Try-On Gateway
//!
//! Image preparation pipeline and retrying generation orchestrator for
//! virtual clothing try-on, served over HTTP together with a
//! credential-holding relay for the remote model.

pub mod api;
pub mod config;
pub mod error;
pub mod garment;
pub mod orchestrator;
pub mod pipeline;
pub mod progress;
pub mod relay;
pub mod remote;
pub mod response;
pub mod service;
pub mod stylist;

pub use error::{AppError, Result};

use std::sync::Arc;

use relay::Relay;
use remote::RemoteGeneration;
use service::TryOnService;
use stylist::Stylist;

/// Application state shared across all handlers
pub struct AppState {
    pub settings: Arc<config::Settings>,
    pub remote: Arc<dyn RemoteGeneration>,
    pub service: Arc<TryOnService>,
    pub stylist: Arc<Stylist>,
    /// Present when `relay.enabled` is set
    pub relay: Option<Arc<Relay>>,
}

impl AppState {
    /// Wire every component from settings around one remote strategy
    pub fn from_settings(
        settings: config::Settings,
        remote: Arc<dyn RemoteGeneration>,
    ) -> Result<Self> {
        let service = Arc::new(TryOnService::new(remote.clone(), &settings)?);
        let stylist = Arc::new(Stylist::new(remote.clone(), settings.remote.text_model.clone()));
        let relay = if settings.relay.enabled {
            Some(Arc::new(Relay::new(&settings.relay, settings.remote.api_key.clone())?))
        } else {
            None
        };

        Ok(Self {
            settings: Arc::new(settings),
            remote,
            service,
            stylist,
            relay,
        })
    }
}
