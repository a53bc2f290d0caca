//! Image generation (`POST /generate`).

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::routing::post;
use axum::{Json, Router};
use nanobanana_core::{ApiKey, CredentialProvider, GenerationRequest, PerRequestCredential};
use tracing::info;
use utoipa::OpenApi;

use crate::config::{Config, CredentialMode};
use crate::error::{ErrorBody, ServerError};
use crate::models::api::{GenerateRequest, GenerateResponse, GeneratedImageData};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(generate), components(schemas(GenerateRequest, GenerateResponse, GeneratedImageData, ErrorBody)))]
pub struct GenerateApi;

pub fn router(config: &Config) -> Router<Arc<AppState>> {
    Router::new()
        .route("/generate", post(generate))
        .layer(DefaultBodyLimit::max(config.max_json_bytes()))
}

/// Generate or edit images from a prompt and up to 10 reference images.
///
/// References that are remote URLs are not sent to Gemini; they are listed
/// in `warnings` instead.
#[utoipa::path(
    post,
    path = "/generate",
    tag = "generate",
    request_body = GenerateRequest,
    responses(
        (status = 200, description = "Images generated", body = GenerateResponse),
        (status = 400, description = "Invalid request or content refused by Gemini", body = ErrorBody),
        (status = 500, description = "Gemini returned an unusable response", body = ErrorBody),
    )
)]
pub async fn generate(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<GenerateResponse>, ServerError> {
    let Json(req) = payload.map_err(|e| ServerError::BadRequest(e.body_text()))?;

    info!(
        prompt_chars = req.prompt.chars().count(),
        references = req.image_urls.len(),
        num_images = ?req.num_images,
        has_api_key = req.api_key.as_deref().is_some_and(|k| !k.trim().is_empty()),
        "generate request"
    );

    let credential = resolve_credential(&state, req.api_key.as_deref()).await?;
    let generation = state
        .generator
        .generate(GenerationRequest {
            prompt: req.prompt,
            references: req.image_urls,
            credential,
            num_images: req.num_images,
        })
        .await?;

    let data = generation
        .images
        .into_iter()
        .map(|image| GeneratedImageData {
            url: image.retrieval_url,
            base64: image.data_uri,
            revised_prompt: image.source_prompt,
        })
        .collect();

    Ok(Json(GenerateResponse {
        data,
        warnings: generation.warnings.iter().map(ToString::to_string).collect(),
    }))
}

/// The key for this call, according to the configured [`CredentialMode`].
async fn resolve_credential(state: &AppState, from_body: Option<&str>) -> Result<Option<ApiKey>, ServerError> {
    let key = match state.config.credential_mode {
        CredentialMode::Request => PerRequestCredential::from(from_body).credential().await?,
        CredentialMode::Stored => state.credentials.credential().await?,
    };
    Ok(key)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
