//! Server configuration, loaded from environment variables at startup.

use std::path::PathBuf;
use std::time::Duration;

use strum::{Display, EnumString};

const MB: usize = 1024 * 1024;

/// Slack added to the upload body limit for multipart boundaries and headers.
const MULTIPART_OVERHEAD_BYTES: usize = MB;

/// Where `/generate` takes its Gemini API key from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum CredentialMode {
    /// `apiKey` in each request body.
    Request,
    /// The key saved through `POST /save-api-key`.
    Stored,
}

/// Runtime configuration for nanobanana-server.
///
/// Every field has a default so the server runs without any environment
/// variables set.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:3000"`).
    pub bind_address: String,

    /// Base under which `/uploads/<file>` URLs are built.
    pub public_url: String,

    /// Directory for uploaded and generated images.
    pub upload_dir: PathBuf,

    /// Per-file upload limit in megabytes.
    pub max_upload_mb: usize,

    /// Maximum files per upload request.
    pub max_upload_files: usize,

    /// JSON body limit for `/generate` in megabytes; reference images travel
    /// inline as base64.
    pub max_json_mb: usize,

    pub credential_mode: CredentialMode,

    /// Credential file used by `/save-api-key` and [`CredentialMode::Stored`].
    pub credential_path: PathBuf,

    pub gemini_base_url: String,
    pub gemini_model: String,

    /// Upstream request timeout in seconds; `0` disables it.
    pub request_timeout_secs: u64,

    /// Reject non-`STOP` finish reasons before looking for images.
    pub check_finish_reason: bool,

    /// Delete stored media older than this many hours; `0` disables the sweep.
    pub retention_hours: u64,

    /// Comma-separated CORS origins; unset allows any origin.
    pub cors_allowed_origins: Option<String>,

    /// Serve `/api-docs/openapi.json`.
    pub enable_api_docs: bool,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".into(),
            public_url: "http://localhost:3000".into(),
            upload_dir: PathBuf::from("uploads"),
            max_upload_mb: 200,
            max_upload_files: nanobanana_core::MAX_REFERENCE_IMAGES,
            max_json_mb: 500,
            credential_mode: CredentialMode::Request,
            credential_path: PathBuf::from("api-key.json"),
            gemini_base_url: "https://generativelanguage.googleapis.com/v1beta".into(),
            gemini_model: "gemini-2.5-flash-image-preview".into(),
            request_timeout_secs: 120,
            check_finish_reason: true,
            retention_hours: 168,
            cors_allowed_origins: None,
            enable_api_docs: true,
            log_level: "info".into(),
            log_json: false,
        }
    }
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            bind_address: env_or("NANOBANANA_BIND", &d.bind_address),
            public_url: env_or("NANOBANANA_PUBLIC_URL", &d.public_url),
            upload_dir: std::env::var_os("NANOBANANA_UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(d.upload_dir),
            max_upload_mb: parse_env("NANOBANANA_MAX_UPLOAD_MB", d.max_upload_mb),
            max_upload_files: d.max_upload_files,
            max_json_mb: parse_env("NANOBANANA_MAX_JSON_MB", d.max_json_mb),
            credential_mode: parse_env("NANOBANANA_CREDENTIAL_MODE", d.credential_mode),
            credential_path: std::env::var_os("NANOBANANA_CREDENTIAL_PATH")
                .map(PathBuf::from)
                .unwrap_or(d.credential_path),
            gemini_base_url: env_or("NANOBANANA_GEMINI_BASE_URL", &d.gemini_base_url),
            gemini_model: env_or("NANOBANANA_GEMINI_MODEL", &d.gemini_model),
            request_timeout_secs: parse_env("NANOBANANA_REQUEST_TIMEOUT_SECS", d.request_timeout_secs),
            check_finish_reason: env_flag("NANOBANANA_CHECK_FINISH_REASON", d.check_finish_reason),
            retention_hours: parse_env("NANOBANANA_RETENTION_HOURS", d.retention_hours),
            cors_allowed_origins: std::env::var("NANOBANANA_CORS_ORIGINS")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            enable_api_docs: env_flag("NANOBANANA_ENABLE_API_DOCS", d.enable_api_docs),
            log_level: env_or("NANOBANANA_LOG", &d.log_level),
            log_json: env_flag("NANOBANANA_LOG_JSON", d.log_json),
        }
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(MB)
    }

    pub fn max_json_bytes(&self) -> usize {
        self.max_json_mb.saturating_mul(MB)
    }

    /// Body limit for `/upload`: every file at full size plus multipart framing.
    pub fn upload_body_limit(&self) -> usize {
        self.max_upload_bytes()
            .saturating_mul(self.max_upload_files)
            .saturating_add(MULTIPART_OVERHEAD_BYTES)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }

    pub fn retention(&self) -> Option<Duration> {
        (self.retention_hours > 0).then(|| Duration::from_secs(self.retention_hours * 3600))
    }

    /// Public URL prefix of the upload directory.
    pub fn uploads_url(&self) -> String {
        format!("{}/uploads", self.public_url.trim_end_matches('/'))
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(v) => v.trim().parse().unwrap_or_else(|_| {
            // Tracing is not up yet when configuration is read.
            eprintln!("WARN: {key}='{v}' is not valid; using the default");
            default
        }),
        Err(_) => default,
    }
}

fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| parse_flag(&v).unwrap_or(default))
        .unwrap_or(default)
}

fn parse_flag(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
