//! Local media storage for uploaded and generated images.
//!
//! Every stored file gets a server-chosen name and is reachable at
//! `<public prefix>/<filename>`; the HTTP layer serves the directory
//! statically under that prefix.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use base64::Engine as _;
use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

const UPLOAD_PREFIX: &str = "upload_";
const GENERATED_PREFIX: &str = "generated_";

/// A file written by [`MediaStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMedia {
    pub filename: String,
    pub path: PathBuf,
    /// Public retrieval URL.
    pub url: String,
}

#[derive(Debug)]
pub struct MediaStore {
    root: PathBuf,
    public_prefix: String,
    last_stamp: AtomicI64,
}

impl MediaStore {
    /// Open (creating if needed) the directory at `root`.
    ///
    /// `public_prefix` is the URL under which `root` is served, e.g.
    /// `http://localhost:3000/uploads`.
    pub async fn open(root: impl Into<PathBuf>, public_prefix: impl Into<String>) -> io::Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self {
            root,
            public_prefix: public_prefix.into().trim_end_matches('/').to_owned(),
            last_stamp: AtomicI64::new(0),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn url_for(&self, filename: &str) -> String {
        format!("{}/{}", self.public_prefix, filename)
    }

    /// Millisecond timestamp for naming a batch of generated files.
    ///
    /// Strictly increasing within the process, so two batches never share a
    /// stamp even when they land in the same millisecond.
    pub fn next_stamp(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let previous = self
            .last_stamp
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or(now);
        now.max(previous + 1)
    }

    /// Store an uploaded file as `upload_<uuid>.<ext>`.
    pub async fn save_upload(&self, mime_type: &str, bytes: &[u8]) -> io::Result<StoredMedia> {
        let filename = format!("{UPLOAD_PREFIX}{}.{}", Uuid::new_v4().simple(), extension_for(mime_type));
        self.write(filename, bytes).await
    }

    /// Store a generated image as `generated_<stamp>_<index>.<ext>`.
    pub async fn save_generated(
        &self,
        stamp: i64,
        index: usize,
        mime_type: &str,
        bytes: &[u8],
    ) -> io::Result<StoredMedia> {
        let filename = format!("{GENERATED_PREFIX}{stamp}_{index}.{}", extension_for(mime_type));
        self.write(filename, bytes).await
    }

    /// Read back a previously stored file.
    pub async fn read(&self, filename: &str) -> io::Result<Vec<u8>> {
        if filename.contains(['/', '\\']) || filename.starts_with('.') {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a stored file name: {filename}"),
            ));
        }
        tokio::fs::read(self.root.join(filename)).await
    }

    /// Remove files written earlier in a request that is now failing.
    pub async fn discard(&self, stored: &[StoredMedia]) {
        for file in stored {
            match tokio::fs::remove_file(&file.path).await {
                Ok(()) => debug!(file = %file.filename, "media file discarded"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!(file = %file.filename, error = %e, "failed to discard media file"),
            }
        }
    }

    /// Delete stored files whose modification time is at least `max_age` ago.
    ///
    /// Only files named by this store are considered. Returns the number of
    /// files removed.
    pub async fn sweep(&self, max_age: Duration) -> io::Result<usize> {
        let mut removed = 0;
        let mut entries = tokio::fs::read_dir(&self.root).await?;

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if !(name.starts_with(UPLOAD_PREFIX) || name.starts_with(GENERATED_PREFIX)) {
                continue;
            }

            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            let expired = metadata
                .modified()
                .ok()
                .and_then(|modified| modified.elapsed().ok())
                .is_some_and(|age| age >= max_age);
            if !expired {
                continue;
            }

            match tokio::fs::remove_file(entry.path()).await {
                Ok(()) => {
                    debug!(file = %name, "expired media file removed");
                    removed += 1;
                }
                Err(e) => warn!(file = %name, error = %e, "failed to remove expired media file"),
            }
        }

        Ok(removed)
    }

    async fn write(&self, filename: String, bytes: &[u8]) -> io::Result<StoredMedia> {
        let path = self.root.join(&filename);
        tokio::fs::write(&path, bytes).await?;
        debug!(file = %filename, size_bytes = bytes.len(), "media file stored");
        Ok(StoredMedia {
            url: self.url_for(&filename),
            filename,
            path,
        })
    }
}

/// File extension for a media type: the subtype up to any `+suffix` or
/// parameters, e.g. `image/svg+xml` → `svg`, `image/jpeg` → `jpeg`.
pub fn extension_for(mime_type: &str) -> String {
    let ext: String = mime_type
        .split_once('/')
        .map(|(_, subtype)| subtype)
        .unwrap_or_default()
        .split(['+', ';'])
        .next()
        .unwrap_or_default()
        .trim()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect();

    if ext.is_empty() { "bin".to_owned() } else { ext }
}

/// `data:<mime>;base64,<payload>` for the given bytes.
pub fn data_uri(mime_type: &str, bytes: &[u8]) -> String {
    format!(
        "data:{mime_type};base64,{}",
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

// ── Tests ──────────────────────────────────────────────────────────────────────
