//! HTTP surface of the prediction service.

pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::model::ModelState;
use crate::server::state::{AppState, ServerConfig};

pub fn router(config: ServerConfig, model: ModelState) -> Router {
    let body_limit = config.max_upload_bytes;
    let state = Arc::new(AppState::new(config, model));

    Router::new()
        .route("/", get(routes::index::index))
        .route("/health", get(routes::health::health))
        .route("/ready", get(routes::health::readiness))
        .route("/predict", post(routes::predict::predict))
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
}
