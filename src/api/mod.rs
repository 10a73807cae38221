//! HTTP API: try-on, preparation, styling and health routes

pub mod handlers;
pub mod routes;
