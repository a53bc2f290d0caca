//! API credential handling.
//!
//! The Gemini key either travels with each request ([`PerRequestCredential`])
//! or lives in a single JSON file on disk ([`FileCredentialStore`]). Both
//! implement [`CredentialProvider`], so the orchestrator never knows which
//! deployment variant it is running under.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// An opaque Gemini API key.
///
/// Always trimmed and never empty. `Debug` output is redacted so the key can
/// not leak through log fields.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Returns `None` when `raw` is empty or whitespace only.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else if trimmed.len() == raw.len() {
            Some(Self(raw))
        } else {
            Some(Self(trimmed.to_owned()))
        }
    }

    /// The raw key, for placing into the outgoing request.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

#[derive(Debug, Error)]
pub enum CredentialError {
    /// The caller tried to save a blank key.
    #[error("API key must not be empty")]
    Empty,

    #[error("failed to access credential file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to encode credential file: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Source of the credential used for one generation call.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// `Ok(None)` means no credential is configured.
    async fn credential(&self) -> Result<Option<ApiKey>, CredentialError>;
}

/// Credential supplied in the request body.
#[derive(Debug, Clone, Default)]
pub struct PerRequestCredential(Option<ApiKey>);

impl From<Option<&str>> for PerRequestCredential {
    fn from(raw: Option<&str>) -> Self {
        Self(raw.and_then(ApiKey::new))
    }
}

#[async_trait]
impl CredentialProvider for PerRequestCredential {
    async fn credential(&self) -> Result<Option<ApiKey>, CredentialError> {
        Ok(self.0.clone())
    }
}

// ── File-backed store ─────────────────────────────────────────────────────────

/// On-disk shape: `{ "apiKey": "<string>" }`.
#[derive(Debug, Serialize, Deserialize)]
struct CredentialFile {
    #[serde(rename = "apiKey")]
    api_key: String,
}

/// Single-credential store persisted as a JSON file.
///
/// The file is read lazily on first use and cached; [`save`](Self::save)
/// replaces both the file and the cache wholesale. A file that fails to parse
/// is deleted and treated as "no credential".
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    /// Outer `None`: not loaded yet.
    cached: RwLock<Option<Option<ApiKey>>>,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cached: RwLock::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Return the stored key, reading the file on first call.
    pub async fn load(&self) -> Result<Option<ApiKey>, CredentialError> {
        if let Some(cached) = self.cached.read().await.as_ref() {
            return Ok(cached.clone());
        }

        let mut slot = self.cached.write().await;
        if let Some(cached) = slot.as_ref() {
            return Ok(cached.clone());
        }
        let loaded = self.read_from_disk().await?;
        *slot = Some(loaded.clone());
        Ok(loaded)
    }

    /// Overwrite the stored key.
    ///
    /// The new file is written next to the old one and renamed over it, so a
    /// crash mid-write never leaves a half-written credential behind.
    pub async fn save(&self, raw: &str) -> Result<(), CredentialError> {
        let key = ApiKey::new(raw).ok_or(CredentialError::Empty)?;
        let body = serde_json::to_vec_pretty(&CredentialFile {
            api_key: key.expose().to_owned(),
        })?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(e))?;
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, body)
            .await
            .map_err(|e| self.io_error(e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| self.io_error(e))?;

        *self.cached.write().await = Some(Some(key));
        debug!(path = %self.path.display(), "credential file written");
        Ok(())
    }

    async fn read_from_disk(&self) -> Result<Option<ApiKey>, CredentialError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no credential file");
                return Ok(None);
            }
            Err(e) => return Err(self.io_error(e)),
        };

        match serde_json::from_slice::<CredentialFile>(&bytes) {
            Ok(file) => Ok(ApiKey::new(file.api_key)),
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "credential file is corrupted; removing it"
                );
                match tokio::fs::remove_file(&self.path).await {
                    Ok(()) => {}
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => warn!(
                        path = %self.path.display(),
                        error = %e,
                        "failed to remove corrupted credential file"
                    ),
                }
                Ok(None)
            }
        }
    }

    fn io_error(&self, source: io::Error) -> CredentialError {
        CredentialError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl CredentialProvider for FileCredentialStore {
    async fn credential(&self) -> Result<Option<ApiKey>, CredentialError> {
        self.load().await
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
