//! Health endpoint.
//!
//! Reports liveness plus a small snapshot of session load so operators
//! can see at a glance whether the assistant is holding state.

use axum::{Json, Router, extract::State, routing::get};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

/// Health snapshot.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Always `"ok"` when the process can answer at all.
    pub status: String,
    /// Service identifier, stable across versions.
    pub service: String,
    /// Crate version of the server binary.
    pub version: String,
    /// Sessions currently tracked in the registry.
    pub active_sessions: usize,
}

/// `GET /health` — liveness plus session load.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "quill-assistant".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        active_sessions: state.handler.active_sessions().await,
    })
}

/// Create health check routes.
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
