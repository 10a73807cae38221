//! Router assembly

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::api::handlers;
use crate::relay;
use crate::AppState;

/// Room for two base64-encoded uploads at the upload limit
const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

/// Build the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .route("/health", get(handlers::health))
        .route("/v1/tryon", post(handlers::try_on))
        .route("/v1/images/prepare", post(handlers::prepare_image))
        .route("/v1/style/recommendations", post(handlers::style_recommendations))
        .with_state(state.clone());

    if let Some(relay) = state.relay.clone() {
        app = app.merge(relay::router(relay));
    }

    app.layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
}
