//! Unified server error type.
//!
//! Every handler returns `Result<T, ServerError>`, which implements
//! [`axum::response::IntoResponse`] so errors become a JSON body of the shape
//! `{ error, status?, details?, hint?, finishReason? }`.
//!
//! Local I/O failures are logged in full but only a generic message is
//! returned, so file paths never leak to clients.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use nanobanana_core::{CredentialError, ErrorKind, GenerationError};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};
use utoipa::ToSchema;

/// JSON error body returned by every endpoint.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: String,
    /// Upstream HTTP status, when Gemini answered with an error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Raw Gemini finish reason for content-policy refusals.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// All errors that can occur in the nanobanana-server request lifecycle.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Propagated from the generation pipeline.
    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// The caller sent an invalid or malformed request.
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    fn status_and_body(&self) -> (StatusCode, ErrorBody) {
        match self {
            ServerError::Generation(e) => generation_response(e),
            ServerError::Credential(CredentialError::Empty) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: "API key must not be empty".into(),
                    ..ErrorBody::default()
                },
            ),
            ServerError::Credential(e) => {
                error!(error = %e, "credential store error");
                internal()
            }
            ServerError::BadRequest(m) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: m.clone(),
                    ..ErrorBody::default()
                },
            ),
            ServerError::Io(e) => {
                error!(error = %e, "i/o error");
                internal()
            }
        }
    }
}

fn internal() -> (StatusCode, ErrorBody) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        ErrorBody {
            error: "internal server error".into(),
            ..ErrorBody::default()
        },
    )
}

fn generation_response(e: &GenerationError) -> (StatusCode, ErrorBody) {
    let status = match e.kind() {
        ErrorKind::Validation | ErrorKind::UpstreamContentPolicy => StatusCode::BAD_REQUEST,
        ErrorKind::UpstreamTransport => e
            .upstream_status()
            .and_then(|s| StatusCode::from_u16(s).ok())
            .filter(|s| s.is_client_error() || s.is_server_error())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        ErrorKind::UpstreamMalformed => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorKind::LocalIo => {
            error!(error = %e, "local i/o failure during generation");
            return internal();
        }
    };

    if status.is_server_error() {
        error!(error = %e, status = status.as_u16(), "generation failed");
    } else {
        warn!(error = %e, status = status.as_u16(), "generation rejected");
    }

    let error = match e {
        GenerationError::UpstreamStatus { .. } => "Gemini API call failed".to_owned(),
        other => other.to_string(),
    };

    (
        status,
        ErrorBody {
            error,
            status: e.upstream_status(),
            details: e.details(),
            hint: e.hint().map(str::to_owned),
            finish_reason: e.finish_reason().map(str::to_owned),
        },
    )
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
