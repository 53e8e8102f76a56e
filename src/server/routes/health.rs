//! Liveness and readiness endpoints

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use serde_json::{json, Value};

use crate::model::ModelState;
use crate::server::state::SharedState;

/// GET /health - constant liveness answer, independent of model state
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "OK" }))
}

#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub uptime_seconds: u64,
    pub version: &'static str,
}

/// GET /ready - 503 while the artifacts failed to load
pub async fn readiness(State(state): State<SharedState>) -> (StatusCode, Json<ReadinessResponse>) {
    let (status, label, reason) = match &state.model {
        ModelState::Ready(_) => (StatusCode::OK, "ready", None),
        ModelState::Failed(reason) => (
            StatusCode::SERVICE_UNAVAILABLE,
            "unavailable",
            Some(reason.clone()),
        ),
    };

    (
        status,
        Json(ReadinessResponse {
            status: label,
            reason,
            uptime_seconds: state.uptime_seconds(),
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}
