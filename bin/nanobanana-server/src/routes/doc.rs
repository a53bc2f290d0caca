use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::routes::{credentials, generate, health, upload};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(info(
    title = "nanobanana-server",
    description = "Image generation and editing backed by Google Gemini",
))]
pub struct ApiDoc;

pub fn get_docs() -> utoipa::openapi::OpenApi {
    let mut root = ApiDoc::openapi();
    root.merge(health::HealthApi::openapi());
    root.merge(upload::UploadApi::openapi());
    root.merge(credentials::CredentialsApi::openapi());
    root.merge(generate::GenerateApi::openapi());
    root
}

/// Serve the OpenAPI document at `/api-docs/openapi.json`.
pub fn router() -> Router<Arc<AppState>> {
    let docs = Arc::new(get_docs());
    Router::new().route(
        "/api-docs/openapi.json",
        get(move || {
            let docs = Arc::clone(&docs);
            async move { Json(docs.as_ref().clone()) }
        }),
    )
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn every_route_is_documented() {
        let docs = get_docs();
        for path in ["/health", "/upload", "/save-api-key", "/generate"] {
            assert!(docs.paths.paths.contains_key(path), "{path}");
        }
    }
}
