//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use nanobanana_core::{FileCredentialStore, Generator, MediaStore};

use crate::config::Config;

/// State shared across all HTTP handlers and the retention sweeper.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    /// Upload directory; also holds generated images.
    pub media: Arc<MediaStore>,
    /// Key written by `/save-api-key`.
    pub credentials: Arc<FileCredentialStore>,
    pub generator: Arc<Generator>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("media", &self.media.root())
            .field("credentials", &self.credentials.path())
            .field("model", &self.generator.model())
            .finish()
    }
}

// ── Test fixtures ─────────────────────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, header};
    use base64::Engine as _;
    use http_body_util::BodyExt;
    use nanobanana_core::gemini::types::GenerateContentRequest;
    use nanobanana_core::{ApiKey, RawResponse, Transport, TransportError};
    use tempfile::TempDir;

    use super::*;

    /// Canned Gemini responder that records what it was sent.
    pub struct StubTransport {
        status: u16,
        body: String,
        calls: AtomicUsize,
        pub last_key: Mutex<Option<String>>,
        pub last_request: Mutex<Option<GenerateContentRequest>>,
    }

    impl StubTransport {
        pub fn new(status: u16, body: impl Into<String>) -> Arc<Self> {
            Arc::new(Self {
                status,
                body: body.into(),
                calls: AtomicUsize::new(0),
                last_key: Mutex::new(None),
                last_request: Mutex::new(None),
            })
        }

        /// 200 with one inline PNG.
        pub fn png() -> Arc<Self> {
            let data = base64::engine::general_purpose::STANDARD.encode(b"\x89PNG test");
            Self::new(
                200,
                serde_json::json!({
                    "candidates": [{
                        "content": { "parts": [
                            { "inlineData": { "mimeType": "image/png", "data": data } }
                        ]},
                        "finishReason": "STOP"
                    }]
                })
                .to_string(),
            )
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Transport for StubTransport {
        async fn generate_content(
            &self,
            _model: &str,
            api_key: &ApiKey,
            request: &GenerateContentRequest,
        ) -> Result<RawResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_key.lock().unwrap() = Some(api_key.expose().to_owned());
            *self.last_request.lock().unwrap() = Some(request.clone());
            Ok(RawResponse {
                status: self.status,
                body: self.body.clone(),
            })
        }
    }

    /// State rooted in a fresh temp dir. Keep the `TempDir` alive for the test.
    pub async fn test_state(transport: Arc<StubTransport>, config: Config) -> (TempDir, Arc<AppState>) {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            upload_dir: dir.path().join("uploads"),
            credential_path: dir.path().join("api-key.json"),
            ..config
        };

        let media = Arc::new(
            MediaStore::open(&config.upload_dir, config.uploads_url())
                .await
                .unwrap(),
        );
        let generator = Generator::new(transport, media.clone(), config.gemini_model.clone())
            .with_finish_reason_check(config.check_finish_reason);

        let state = Arc::new(AppState {
            credentials: Arc::new(FileCredentialStore::new(&config.credential_path)),
            config: Arc::new(config),
            media,
            generator: Arc::new(generator),
        });
        (dir, state)
    }

    const BOUNDARY: &str = "nanobanana-test-boundary";

    /// `(field, content type, bytes)` parts as a multipart `/upload` request.
    pub fn upload_request(parts: &[(&str, Option<&str>, &[u8])]) -> Request<Body> {
        let mut body = Vec::new();
        for (i, (name, content_type, bytes)) in parts.iter().enumerate() {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{name}\"; filename=\"f{i}\"\r\n")
                    .as_bytes(),
            );
            if let Some(ct) = content_type {
                body.extend_from_slice(format!("Content-Type: {ct}\r\n").as_bytes());
            }
            body.extend_from_slice(b"\r\n");
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    pub async fn json_body(resp: axum::response::Response) -> serde_json::Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }
}
