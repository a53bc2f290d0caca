//! Persisted API key (`POST /save-api-key`).

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use tracing::info;
use utoipa::OpenApi;

use crate::error::{ErrorBody, ServerError};
use crate::models::api::{SaveApiKeyRequest, SaveApiKeyResponse};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(save_api_key), components(schemas(SaveApiKeyRequest, SaveApiKeyResponse, ErrorBody)))]
pub struct CredentialsApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/save-api-key", post(save_api_key))
}

/// Overwrite the stored Gemini API key.
#[utoipa::path(
    post,
    path = "/save-api-key",
    tag = "credentials",
    request_body = SaveApiKeyRequest,
    responses(
        (status = 200, description = "Key saved", body = SaveApiKeyResponse),
        (status = 400, description = "Empty key", body = ErrorBody),
        (status = 500, description = "Credential file could not be written", body = ErrorBody),
    )
)]
pub async fn save_api_key(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SaveApiKeyRequest>,
) -> Result<Json<SaveApiKeyResponse>, ServerError> {
    state.credentials.save(&req.api_key).await?;
    info!(path = %state.credentials.path().display(), "API key saved");
    Ok(Json(SaveApiKeyResponse { success: true }))
}

// ── Tests ──────────────────────────────────────────────────────────────────────
