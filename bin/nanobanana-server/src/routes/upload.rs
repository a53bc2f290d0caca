//! Image upload (`POST /upload`).
//!
//! Files arrive as multipart field `images`. Each one is checked for an
//! `image/*` media type, streamed with a size check, stored under a
//! server-chosen name, then read back and returned as a data URI ready to be
//! passed to `/generate`.

use std::io;
use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::routing::post;
use axum::{Json, Router};
use nanobanana_core::media::{self, MediaStore, StoredMedia};
use tracing::{debug, info};
use utoipa::OpenApi;

use crate::config::Config;
use crate::error::{ErrorBody, ServerError};
use crate::models::api::{UploadForm, UploadResponse, UploadedFile};
use crate::state::AppState;

const IMAGES_FIELD: &str = "images";

#[derive(OpenApi)]
#[openapi(paths(upload_images), components(schemas(UploadForm, UploadResponse, UploadedFile, ErrorBody)))]
pub struct UploadApi;

pub fn router(config: &Config) -> Router<Arc<AppState>> {
    Router::new()
        .route("/upload", post(upload_images))
        .layer(DefaultBodyLimit::max(config.upload_body_limit()))
}

/// Store up to 10 images and return their URLs and data URIs.
#[utoipa::path(
    post,
    path = "/upload",
    tag = "upload",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Files stored", body = UploadResponse),
        (status = 400, description = "No files, too many files, wrong type or too large", body = ErrorBody),
        (status = 500, description = "Files could not be stored", body = ErrorBody),
    )
)]
pub async fn upload_images(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ServerError> {
    let max_bytes = state.config.max_upload_bytes();
    let max_files = state.config.max_upload_files;

    // Every part is checked before anything is written, so a rejected
    // request leaves no files behind.
    let mut pending = Vec::new();
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Failed to read multipart field: {e}")))?
    {
        if field.name() != Some(IMAGES_FIELD) {
            debug!(field = ?field.name(), "ignoring multipart field");
            continue;
        }
        if pending.len() >= max_files {
            return Err(ServerError::BadRequest(format!(
                "Too many files: at most {max_files} images per upload"
            )));
        }

        let content_type = field.content_type().and_then(image_media_type).ok_or_else(|| {
            ServerError::BadRequest(format!(
                "Invalid file type: {}. Only image files are allowed.",
                field.content_type().unwrap_or("none")
            ))
        })?;
        let original_name = field.file_name().map(str::to_owned);

        let mut bytes = Vec::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| ServerError::BadRequest(format!("Failed to read file chunk: {e}")))?
        {
            if bytes.len() + chunk.len() > max_bytes {
                return Err(ServerError::BadRequest(format!(
                    "File too large: exceeds maximum of {}MB",
                    state.config.max_upload_mb
                )));
            }
            bytes.extend_from_slice(&chunk);
        }

        pending.push(PendingUpload {
            content_type,
            original_name,
            bytes,
        });
    }

    if pending.is_empty() {
        return Err(ServerError::BadRequest(format!(
            "No images uploaded; send files in the '{IMAGES_FIELD}' field"
        )));
    }

    let mut stored_files = Vec::with_capacity(pending.len());
    let mut files = Vec::with_capacity(pending.len());
    for upload in &pending {
        match store_upload(&state.media, upload).await {
            Ok((stored, file)) => {
                stored_files.push(stored);
                files.push(file);
            }
            Err(e) => {
                state.media.discard(&stored_files).await;
                return Err(e.into());
            }
        }
    }

    info!(count = files.len(), "upload complete");
    Ok(Json(UploadResponse { files }))
}

struct PendingUpload {
    /// Bare `image/<subtype>`, lowercased.
    content_type: String,
    original_name: Option<String>,
    bytes: Vec<u8>,
}

async fn store_upload(store: &MediaStore, upload: &PendingUpload) -> io::Result<(StoredMedia, UploadedFile)> {
    let stored = store.save_upload(&upload.content_type, &upload.bytes).await?;
    let contents = match store.read(&stored.filename).await {
        Ok(contents) => contents,
        Err(e) => {
            store.discard(std::slice::from_ref(&stored)).await;
            return Err(e);
        }
    };
    debug!(
        file = %stored.filename,
        original_name = ?upload.original_name,
        content_type = %upload.content_type,
        size_bytes = contents.len(),
        "stored uploaded image"
    );

    let file = UploadedFile {
        url: stored.url.clone(),
        base64: media::data_uri(&upload.content_type, &contents),
    };
    Ok((stored, file))
}

/// `image/<subtype>` without parameters, lowercased; `None` for anything
/// that is not an image type.
fn image_media_type(content_type: &str) -> Option<String> {
    let essence = content_type.split(';').next()?.trim().to_ascii_lowercase();
    let subtype = essence.strip_prefix("image/")?;
    let valid = !subtype.is_empty()
        && subtype
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '+' | '.' | '-'));
    valid.then_some(essence)
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::image_media_type;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::routes;
    use crate::state::testing::{StubTransport, json_body, test_state, upload_request};

    #[tokio::test]
    async fn images_are_stored_and_returned_as_data_uris() {
        let (_dir, state) = test_state(StubTransport::png(), Config::default()).await;
        let app = routes::build(state.clone());

        let resp = app
            .oneshot(upload_request(&[
                ("images", Some("image/png"), &b"png-bytes"[..]),
                ("note", None, &b"ignored"[..]),
                ("images", Some("image/jpeg"), &b"jpeg-bytes"[..]),
            ]))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = json_body(resp).await;
        let files = body["files"].as_array().unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0]["base64"], "data:image/png;base64,cG5nLWJ5dGVz");
        assert!(files[1]["base64"].as_str().unwrap().starts_with("data:image/jpeg;base64,"));

        let url = files[0]["url"].as_str().unwrap();
        assert!(url.starts_with("http://localhost:3000/uploads/upload_"));
        assert!(url.ends_with(".png"));
        assert_eq!(std::fs::read_dir(state.media.root()).unwrap().count(), 2);
    }

    #[tokio::test]
    async fn non_image_files_are_rejected() {
        let (_dir, state) = test_state(StubTransport::png(), Config::default()).await;

        for content_type in [Some("text/plain"), None] {
            let resp = routes::build(state.clone())
                .oneshot(upload_request(&[
                    ("images", Some("image/png"), &b"ok"[..]),
                    ("images", content_type, &b"hello"[..]),
                ]))
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
            assert!(json_body(resp).await["error"]
                .as_str()
                .unwrap()
                .contains("Invalid file type"));
        }
        assert_eq!(std::fs::read_dir(state.media.root()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn empty_and_oversized_uploads_are_rejected() {
        let config = Config {
            max_upload_mb: 1,
            ..Config::default()
        };
        let (_dir, state) = test_state(StubTransport::png(), config).await;

        let resp = routes::build(state.clone())
            .oneshot(upload_request(&[("other", Some("image/png"), &b"x"[..])]))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let big = vec![0u8; 1024 * 1024 + 1];
        let resp = routes::build(state.clone())
            .oneshot(upload_request(&[("images", Some("image/png"), &big[..])]))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(resp).await["error"]
            .as_str()
            .unwrap()
            .contains("File too large"));
        assert_eq!(std::fs::read_dir(state.media.root()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn more_than_ten_files_are_rejected() {
        let (_dir, state) = test_state(StubTransport::png(), Config::default()).await;
        let parts: Vec<(&str, Option<&str>, &[u8])> =
            (0..11).map(|_| ("images", Some("image/png"), &b"x"[..])).collect();

        let resp = routes::build(state.clone())
            .oneshot(upload_request(&parts))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(std::fs::read_dir(state.media.root()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn content_type_parameters_are_dropped() {
        let (_dir, state) = test_state(StubTransport::png(), Config::default()).await;

        let resp = routes::build(state)
            .oneshot(upload_request(&[("images", Some("Image/PNG; name=a.png"), &b"hi"[..])]))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = json_body(resp).await;
        assert_eq!(body["files"][0]["base64"], "data:image/png;base64,aGk=");
        assert!(body["files"][0]["url"].as_str().unwrap().ends_with(".png"));
    }

    #[test]
    fn media_type_is_reduced_to_its_essence() {
        assert_eq!(image_media_type("image/png").as_deref(), Some("image/png"));
        assert_eq!(image_media_type(" IMAGE/JPEG ; q=1").as_deref(), Some("image/jpeg"));
        assert_eq!(image_media_type("image/x-icon").as_deref(), Some("image/x-icon"));
        assert_eq!(image_media_type("image/svg+xml; charset=utf-8").as_deref(), Some("image/svg+xml"));
        assert!(image_media_type("image/").is_none());
        assert!(image_media_type("image/p ng").is_none());
        assert!(image_media_type("text/plain").is_none());
    }

    #[tokio::test]
    async fn uploaded_file_is_served_statically() {
        let (_dir, state) = test_state(StubTransport::png(), Config::default()).await;

        let resp = routes::build(state.clone())
            .oneshot(upload_request(&[("images", Some("image/png"), &b"served"[..])]))
            .await
            .unwrap();
        let body = json_body(resp).await;
        let url = body["files"][0]["url"].as_str().unwrap();
        let path = url.trim_start_matches("http://localhost:3000");

        let resp = routes::build(state)
            .oneshot(Request::get(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"served");
    }
}
