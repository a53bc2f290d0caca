//! Interprets a Gemini response body and persists the images it carries.
//!
//! Classification happens before anything touches disk: a refused,
//! malformed or undecodable response never leaves files behind, and a batch
//! whose writes fail partway is removed again.

use std::sync::Arc;

use base64::Engine as _;
use tracing::{debug, info, warn};

use crate::error::GenerationError;
use crate::gemini::types::{GenerateContentResponse, ResponsePart};
use crate::media::{self, MediaStore};

/// Used when Gemini omits `mimeType` on an inline part.
pub const DEFAULT_IMAGE_MIME: &str = "image/png";

// ── Classification ───────────────────────────────────────────────────────────

/// What one upstream exchange amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    ContentFiltered,
    NoImage,
    TokenLimit,
    MalformedResponse,
    TransportError,
    Other,
}

/// Candidate finish reasons as reported by Gemini.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    NoImage,
    Safety,
    Recitation,
    Blocklist,
    ProhibitedContent,
    Spii,
    ImageSafety,
    MaxTokens,
    /// Not a candidate finish reason: `promptFeedback.blockReason` rejected
    /// the prompt for a reason without a filter of its own.
    PromptBlocked,
    /// Any reason this crate does not know by name.
    Other,
}

impl FinishReason {
    pub fn from_wire(raw: &str) -> Self {
        match raw {
            "STOP" => Self::Stop,
            "NO_IMAGE" => Self::NoImage,
            "SAFETY" => Self::Safety,
            "RECITATION" => Self::Recitation,
            "BLOCKLIST" => Self::Blocklist,
            "PROHIBITED_CONTENT" => Self::ProhibitedContent,
            "SPII" => Self::Spii,
            "IMAGE_SAFETY" => Self::ImageSafety,
            "MAX_TOKENS" => Self::MaxTokens,
            _ => Self::Other,
        }
    }

    pub fn outcome(self) -> Outcome {
        match self {
            Self::Stop => Outcome::Success,
            Self::NoImage => Outcome::NoImage,
            Self::Safety
            | Self::Recitation
            | Self::Blocklist
            | Self::ProhibitedContent
            | Self::Spii
            | Self::ImageSafety
            | Self::PromptBlocked => Outcome::ContentFiltered,
            Self::MaxTokens => Outcome::TokenLimit,
            Self::Other => Outcome::Other,
        }
    }

    /// User-facing explanation.
    pub fn message(self) -> &'static str {
        match self {
            Self::Stop => "Generation finished",
            Self::NoImage => {
                "The model could not generate an image for this prompt. The prompt may not \
                 match the reference images, or may be too complex or vague. Simplify it, \
                 keep it related to the references, or describe it in English"
            }
            Self::Safety => "Content was blocked by the safety filter; please revise the prompt",
            Self::Recitation => "The generated content may involve copyrighted material",
            Self::Blocklist => "The prompt contains blocked terms; please revise it",
            Self::ProhibitedContent => "The prompt asks for prohibited content",
            Self::Spii => "The content may contain sensitive personal information",
            Self::ImageSafety => {
                "The generated image was blocked by the safety filter; please revise the prompt"
            }
            Self::PromptBlocked => "The prompt was blocked by Gemini; please revise it",
            Self::MaxTokens => {
                "Token limit exceeded; use fewer reference images or a simpler prompt"
            }
            Self::Other => "Generation failed, please try again",
        }
    }
}

// ── Output ───────────────────────────────────────────────────────────────────

/// A decoded image that has been written to the media store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub filename: String,
    pub retrieval_url: String,
    pub data_uri: String,
    /// The caller's prompt; Gemini never rewrites it.
    pub source_prompt: String,
}

/// Decoded, not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

// ── Normalizer ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ResponseNormalizer {
    store: Arc<MediaStore>,
    check_finish_reason: bool,
}

impl ResponseNormalizer {
    pub fn new(store: Arc<MediaStore>) -> Self {
        Self {
            store,
            check_finish_reason: true,
        }
    }

    /// When disabled, a non-`STOP` finish reason is ignored and the parts are
    /// scanned anyway.
    pub fn with_finish_reason_check(mut self, enabled: bool) -> Self {
        self.check_finish_reason = enabled;
        self
    }

    /// Classify `body` and decode every inline image, in part order.
    pub fn extract(&self, body: &str) -> Result<Vec<DecodedImage>, GenerationError> {
        let response: GenerateContentResponse = serde_json::from_str(body).map_err(|e| {
            warn!(error = %e, "Gemini response is not valid JSON");
            GenerationError::malformed("failed to parse Gemini response", Some(body))
        })?;

        let Some(candidate) = response.candidates.first() else {
            if let Some(raw) = response
                .prompt_feedback
                .and_then(|feedback| feedback.block_reason)
            {
                let reason = match FinishReason::from_wire(&raw) {
                    reason if reason.outcome() == Outcome::ContentFiltered => reason,
                    _ => FinishReason::PromptBlocked,
                };
                info!(block_reason = %raw, "prompt blocked by Gemini");
                return Err(GenerationError::Refused { reason, raw });
            }
            return Err(GenerationError::malformed(
                "Gemini returned no valid result",
                Some(body),
            ));
        };

        if let Some(raw) = candidate.finish_reason.as_deref() {
            let reason = FinishReason::from_wire(raw);
            if reason != FinishReason::Stop {
                if self.check_finish_reason {
                    info!(finish_reason = %raw, "generation refused");
                    return Err(GenerationError::Refused {
                        reason,
                        raw: raw.to_owned(),
                    });
                }
                debug!(finish_reason = %raw, "finish reason check disabled; scanning parts");
            }
        }

        let Some(parts) = candidate.content.as_ref().and_then(|c| c.parts.as_ref()) else {
            return Err(GenerationError::malformed(
                "unexpected Gemini response format",
                Some(body),
            ));
        };

        let images = parts
            .iter()
            .filter_map(|part| part.inline_data.as_ref())
            .map(|blob| -> Result<DecodedImage, GenerationError> {
                let bytes = base64::engine::general_purpose::STANDARD
                    .decode(blob.data.trim())
                    .map_err(|e| {
                        warn!(error = %e, "inline image data is not valid base64");
                        GenerationError::malformed("Gemini returned undecodable image data", None)
                    })?;
                Ok(DecodedImage {
                    mime_type: blob
                        .mime_type
                        .clone()
                        .filter(|m| !m.is_empty())
                        .unwrap_or_else(|| DEFAULT_IMAGE_MIME.to_owned()),
                    bytes,
                })
            })
            .collect::<Result<Vec<_>, GenerationError>>()?;

        if images.is_empty() {
            let text = text_of(parts);
            if !text.is_empty() {
                debug!(%text, "Gemini replied with text only");
            }
            return Err(GenerationError::malformed(
                "no generated image data found",
                Some(body),
            ));
        }

        Ok(images)
    }

    /// [`extract`](Self::extract), then persist every image under one stamp.
    pub async fn normalize(&self, body: &str, prompt: &str) -> Result<Vec<GeneratedImage>, GenerationError> {
        let decoded = self.extract(body)?;
        let stamp = self.store.next_stamp();
        let images = self.persist(stamp, decoded, prompt).await?;

        info!(count = images.len(), stamp, "generated images stored");
        Ok(images)
    }

    /// Write a decoded batch. All or nothing: on the first failed write the
    /// files already written for this batch are removed.
    async fn persist(
        &self,
        stamp: i64,
        decoded: Vec<DecodedImage>,
        prompt: &str,
    ) -> Result<Vec<GeneratedImage>, GenerationError> {
        let mut written = Vec::with_capacity(decoded.len());
        for (index, image) in decoded.iter().enumerate() {
            match self
                .store
                .save_generated(stamp, index, &image.mime_type, &image.bytes)
                .await
            {
                Ok(stored) => written.push(stored),
                Err(e) => {
                    warn!(index, stamp, error = %e, "failed to store generated image; discarding batch");
                    self.store.discard(&written).await;
                    return Err(e.into());
                }
            }
        }

        Ok(decoded
            .into_iter()
            .zip(written)
            .map(|(image, stored)| GeneratedImage {
                data_uri: media::data_uri(&image.mime_type, &image.bytes),
                filename: stored.filename,
                retrieval_url: stored.url,
                mime_type: image.mime_type,
                bytes: image.bytes,
                source_prompt: prompt.to_owned(),
            })
            .collect())
    }
}

fn text_of(parts: &[ResponsePart]) -> String {
    parts
        .iter()
        .filter_map(|p| p.text.as_deref())
        .collect::<Vec<_>>()
        .join(" ")
}

// ── Tests ──────────────────────────────────────────────────────────────────────
