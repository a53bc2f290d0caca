//! Background deletion of old uploaded and generated images.

use std::sync::Arc;
use std::time::Duration;

use nanobanana_core::MediaStore;
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub const SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

/// Sweep once now, then every [`SWEEP_INTERVAL`]. Returns `None` when
/// retention is disabled.
pub fn spawn(media: Arc<MediaStore>, max_age: Option<Duration>) -> Option<JoinHandle<()>> {
    let max_age = max_age?;
    info!(max_age_hours = max_age.as_secs() / 3600, "media retention enabled");

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            // The first tick completes immediately.
            ticker.tick().await;
            sweep_once(&media, max_age).await;
        }
    }))
}

pub async fn sweep_once(media: &MediaStore, max_age: Duration) -> usize {
    match media.sweep(max_age).await {
        Ok(0) => 0,
        Ok(removed) => {
            info!(removed, "expired media files removed");
            removed
        }
        Err(e) => {
            warn!(error = %e, dir = %media.root().display(), "media sweep failed");
            0
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;
    use tracing_test::traced_test;

    #[tokio::test]
    async fn disabled_retention_spawns_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let media = Arc::new(MediaStore::open(dir.path(), "/uploads").await.unwrap());
        assert!(spawn(media, None).is_none());
    }

    #[tokio::test]
    #[traced_test]
    async fn sweep_removes_expired_files() {
        let dir = tempfile::tempdir().unwrap();
        let media = MediaStore::open(dir.path(), "/uploads").await.unwrap();
        media.save_upload("image/png", b"old").await.unwrap();

        assert_eq!(sweep_once(&media, Duration::ZERO).await, 1);
        assert!(logs_contain("expired media files removed"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn missing_directory_is_logged_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let media = MediaStore::open(dir.path().join("gone"), "/uploads").await.unwrap();
        std::fs::remove_dir(dir.path().join("gone")).unwrap();
        assert_eq!(sweep_once(&media, Duration::ZERO).await, 0);
    }
}
