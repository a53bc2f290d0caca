//! Wire types for `/upload`, `/save-api-key` and `/generate`.
//!
//! Field names are kept exactly as existing front-ends send them, which is
//! why `apiKey` sits next to snake_case `image_urls`.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ── Upload ───────────────────────────────────────────────────────────────────

/// One stored upload.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UploadedFile {
    /// Retrieval URL under `/uploads/`.
    pub url: String,
    /// `data:<mime>;base64,<payload>`, accepted as-is by `/generate`.
    pub base64: String,
}

/// Response body for `POST /upload`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    pub files: Vec<UploadedFile>,
}

/// Multipart form accepted by `POST /upload`.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct UploadForm {
    /// Up to 10 image files.
    #[schema(value_type = Vec<String>, format = Binary)]
    pub images: Vec<Vec<u8>>,
}

// ── Credentials ──────────────────────────────────────────────────────────────

/// Request body for `POST /save-api-key`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SaveApiKeyRequest {
    #[serde(default, rename = "apiKey")]
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SaveApiKeyResponse {
    pub success: bool,
}

// ── Generation ───────────────────────────────────────────────────────────────

/// Request body for `POST /generate`.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct GenerateRequest {
    #[serde(default)]
    pub prompt: String,
    /// Reference images: data URIs, bare base64 or (ignored) remote URLs.
    #[serde(default)]
    pub image_urls: Vec<String>,
    /// Advisory; Gemini decides how many images it returns.
    #[serde(default)]
    pub num_images: Option<u32>,
    /// Used when the server runs in per-request credential mode.
    #[serde(default, rename = "apiKey")]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GeneratedImageData {
    pub url: String,
    /// `data:<mime>;base64,<payload>`.
    pub base64: String,
    /// The prompt as sent; Gemini does not rewrite it.
    pub revised_prompt: String,
}

/// Response body for `POST /generate`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GenerateResponse {
    pub data: Vec<GeneratedImageData>,
    /// References that were accepted but not sent to Gemini.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}
