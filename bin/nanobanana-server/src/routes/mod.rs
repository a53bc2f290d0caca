//! Axum router construction.
//!
//! [`build`] assembles the complete application router, including:
//! - Middleware layers (CORS, per-request trace-ID span)
//! - Optional OpenAPI document (disable with `NANOBANANA_ENABLE_API_DOCS=false`)
//! - Health route
//! - `/upload`, `/save-api-key` and `/generate`
//! - Static serving of the upload directory under `/uploads`

mod credentials;
pub mod doc;
mod generate;
mod health;
mod upload;

use std::sync::Arc;

use axum::{Router, middleware};
use tower::ServiceBuilder;
use tower_http::services::ServeDir;

use crate::middleware::{cors, trace};
use crate::state::AppState;

// ── Router builder ────────────────────────────────────────────────────────────

/// Build the complete Axum [`Router`] for the application.
pub fn build(state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        .merge(health::router())
        .merge(upload::router(&state.config))
        .merge(credentials::router())
        .merge(generate::router(&state.config));

    let mut app = Router::new()
        .merge(api_router)
        .nest_service("/uploads", ServeDir::new(state.media.root()));

    if state.config.enable_api_docs {
        app = app.merge(doc::router());
    }

    app
        // Outermost layers execute first on the way in.
        .layer(ServiceBuilder::new().layer(cors::cors_layer(&state)))
        .layer(middleware::from_fn(trace::trace_middleware))
        .with_state(state)
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::middleware::trace::X_TRACE_ID;
    use crate::state::testing::{StubTransport, json_body, test_state};

    #[tokio::test]
    async fn trace_id_is_echoed() {
        let (_dir, state) = test_state(StubTransport::png(), Config::default()).await;
        let id = "6f1c1a8e-8f4a-4b9e-9a37-2d9d0f3c5b11";

        let resp = build(state)
            .oneshot(
                Request::get("/health")
                    .header(X_TRACE_ID, id)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[X_TRACE_ID], id);
        assert_eq!(json_body(resp).await["status"], "ok");
    }

    #[tokio::test]
    async fn api_docs_can_be_disabled() {
        let (_dir, on) = test_state(StubTransport::png(), Config::default()).await;
        let resp = build(on)
            .oneshot(Request::get("/api-docs/openapi.json").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(json_body(resp).await["paths"]["/generate"].is_object());

        let config = Config {
            enable_api_docs: false,
            ..Config::default()
        };
        let (_dir, off) = test_state(StubTransport::png(), config).await;
        let resp = build(off)
            .oneshot(Request::get("/api-docs/openapi.json").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn missing_upload_is_404() {
        let (_dir, state) = test_state(StubTransport::png(), Config::default()).await;
        let resp = build(state)
            .oneshot(Request::get("/uploads/generated_1_0.png").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
