//! Outbound HTTP to the Gemini API.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use super::types::GenerateContentRequest;
use crate::credential::ApiKey;

/// Status and body of one upstream exchange, before any interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The exchange itself failed; no status was received.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to Gemini failed: {0}")]
    Connect(#[from] reqwest::Error),

    #[error("failed to encode Gemini request: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Sends one `generateContent` call.
///
/// Implementations must not retry: one logical generation is exactly one
/// upstream call.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn generate_content(
        &self,
        model: &str,
        api_key: &ApiKey,
        request: &GenerateContentRequest,
    ) -> Result<RawResponse, TransportError>;
}

/// [`Transport`] backed by a shared [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// `base_url` is the API root, e.g.
    /// `https://generativelanguage.googleapis.com/v1beta`. `timeout` of `None`
    /// leaves requests unbounded.
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        })
    }

    pub fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn generate_content(
        &self,
        model: &str,
        api_key: &ApiKey,
        request: &GenerateContentRequest,
    ) -> Result<RawResponse, TransportError> {
        let url = self.endpoint(model);
        let body = serde_json::to_vec(request)?;
        debug!(%url, size_bytes = body.len(), "sending generateContent");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key.expose())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        debug!(%url, status, size_bytes = body.len(), "generateContent returned");

        Ok(RawResponse { status, body })
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn endpoint_joins_base_and_model() {
        let transport = HttpTransport::new(
            "https://generativelanguage.googleapis.com/v1beta/",
            Some(Duration::from_secs(5)),
        )
        .unwrap();
        assert_eq!(
            transport.endpoint("gemini-2.5-flash-image-preview"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash-image-preview:generateContent"
        );
    }

    #[test]
    fn success_is_any_2xx() {
        let ok = RawResponse { status: 204, body: String::new() };
        let forbidden = RawResponse { status: 403, body: String::new() };
        assert!(ok.is_success());
        assert!(!forbidden.is_success());
    }
}
