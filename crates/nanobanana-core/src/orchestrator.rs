//! One generation, end to end: credential check, payload, a single upstream
//! call, then normalization.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::adapter::{AdapterWarning, PromptAdapter, SamplingConfig};
use crate::credential::ApiKey;
use crate::error::{GenerationError, truncate_body};
use crate::gemini::transport::Transport;
use crate::media::MediaStore;
use crate::normalizer::{GeneratedImage, ResponseNormalizer};

#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    pub prompt: String,
    /// Reference images in any encoding [`ReferenceImage`](crate::ReferenceImage) accepts.
    pub references: Vec<String>,
    /// Resolved by the caller through a [`CredentialProvider`](crate::CredentialProvider).
    pub credential: Option<ApiKey>,
    /// Advisory only; Gemini decides how many images it returns.
    pub num_images: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct Generation {
    pub images: Vec<GeneratedImage>,
    pub warnings: Vec<AdapterWarning>,
}

pub struct Generator {
    transport: Arc<dyn Transport>,
    adapter: PromptAdapter,
    normalizer: ResponseNormalizer,
    model: String,
}

impl Generator {
    pub fn new(transport: Arc<dyn Transport>, media: Arc<MediaStore>, model: impl Into<String>) -> Self {
        Self {
            transport,
            adapter: PromptAdapter::default(),
            normalizer: ResponseNormalizer::new(media),
            model: model.into(),
        }
    }

    pub fn with_sampling(mut self, sampling: SamplingConfig) -> Self {
        self.adapter = PromptAdapter::new(sampling);
        self
    }

    pub fn with_finish_reason_check(mut self, enabled: bool) -> Self {
        self.normalizer = self.normalizer.with_finish_reason_check(enabled);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Run one generation. Exactly one upstream call is made, and only after
    /// every local check has passed.
    pub async fn generate(&self, request: GenerationRequest) -> Result<Generation, GenerationError> {
        let api_key = request.credential.ok_or(GenerationError::MissingCredential)?;
        let adapted = self.adapter.adapt(&request.prompt, &request.references)?;

        info!(
            model = %self.model,
            references = request.references.len(),
            image_parts = adapted.image_parts,
            num_images = ?request.num_images,
            "calling Gemini"
        );

        let response = self
            .transport
            .generate_content(&self.model, &api_key, &adapted.request)
            .await
            .inspect_err(|e| warn!(error = %e, "Gemini transport failed"))?;

        if !response.is_success() {
            warn!(status = response.status, "Gemini returned an error status");
            debug!(body = %truncate_body(&response.body), "Gemini error body");
            return Err(GenerationError::UpstreamStatus {
                status: response.status,
                body: truncate_body(&response.body),
            });
        }
        if response.body.trim().is_empty() {
            return Err(GenerationError::EmptyBody);
        }

        let images = self.normalizer.normalize(&response.body, &request.prompt).await?;
        Ok(Generation {
            images,
            warnings: adapted.warnings,
        })
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
