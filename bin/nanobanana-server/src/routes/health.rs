//! Health / capability endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use utoipa::OpenApi;

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(get_health))]
pub struct HealthApi;

/// Register health-check routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(get_health))
}

/// Heartbeat plus a static description of what this server can do.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Server is healthy", body = Value)
    )
)]
pub async fn get_health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status":  "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "api":     format!("Nano Banana (Google Gemini, {})", state.generator.model()),
        "features": [
            format!("up to {} reference images", nanobanana_core::MAX_REFERENCE_IMAGES),
            "base64 input and output",
            "image editing",
        ],
        "credentialMode": state.config.credential_mode.to_string(),
    }))
}

// ── Tests ──────────────────────────────────────────────────────────────────────
