//! Turns a prompt and reference images into a Gemini request payload.
//!
//! Pure: no network or filesystem access.

use std::fmt;

use tracing::warn;

use crate::error::GenerationError;
use crate::gemini::types::{Content, GenerateContentRequest, GenerationConfig, Modality, Part};
use crate::reference::{RAW_BASE64_MIME, ReferenceError, ReferenceImage};

pub const MAX_REFERENCE_IMAGES: usize = 10;

/// Sampling parameters sent with every request.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingConfig {
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
    /// Ask for image output only.
    pub image_only: bool,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            temperature: 1.0,
            top_k: 40,
            top_p: 0.95,
            max_output_tokens: 8192,
            image_only: true,
        }
    }
}

impl SamplingConfig {
    fn generation_config(&self) -> GenerationConfig {
        GenerationConfig {
            temperature: self.temperature,
            top_k: self.top_k,
            top_p: self.top_p,
            max_output_tokens: self.max_output_tokens,
            response_modalities: if self.image_only {
                vec![Modality::Image]
            } else {
                Vec::new()
            },
        }
    }
}

/// A reference that was accepted but not forwarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterWarning {
    RemoteUrlSkipped { index: usize, href: String },
    EmptyReferenceSkipped { index: usize },
}

impl fmt::Display for AdapterWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RemoteUrlSkipped { index, href } => write!(
                f,
                "reference image {index} is a remote URL ({href}) and was not sent; \
                 upload it first and pass the returned base64"
            ),
            Self::EmptyReferenceSkipped { index } => {
                write!(f, "reference image {index} is empty and was skipped")
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct AdaptedRequest {
    pub request: GenerateContentRequest,
    pub warnings: Vec<AdapterWarning>,
    /// Number of inline image parts, all placed before the text part.
    pub image_parts: usize,
}

#[derive(Debug, Clone, Default)]
pub struct PromptAdapter {
    sampling: SamplingConfig,
}

impl PromptAdapter {
    pub fn new(sampling: SamplingConfig) -> Self {
        Self { sampling }
    }

    pub fn sampling(&self) -> &SamplingConfig {
        &self.sampling
    }

    /// Build the payload: one inline part per forwardable reference in input
    /// order, then a single text part holding the trimmed prompt.
    pub fn adapt(&self, prompt: &str, references: &[String]) -> Result<AdaptedRequest, GenerationError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(GenerationError::EmptyPrompt);
        }
        if references.len() > MAX_REFERENCE_IMAGES {
            return Err(GenerationError::TooManyReferences {
                count: references.len(),
                max: MAX_REFERENCE_IMAGES,
            });
        }

        let mut parts = Vec::with_capacity(references.len() + 1);
        let mut warnings = Vec::new();

        for (index, raw) in references.iter().enumerate() {
            match ReferenceImage::parse(raw) {
                Ok(ReferenceImage::DataUri { mime, payload }) => parts.push(Part::inline(mime, payload)),
                Ok(ReferenceImage::RawBase64 { payload }) => {
                    parts.push(Part::inline(RAW_BASE64_MIME, payload))
                }
                Ok(ReferenceImage::RemoteUrl { href }) => {
                    warn!(index, %href, "remote reference image not forwarded");
                    warnings.push(AdapterWarning::RemoteUrlSkipped { index, href });
                }
                Err(ReferenceError::Empty) => {
                    warn!(index, "empty reference image skipped");
                    warnings.push(AdapterWarning::EmptyReferenceSkipped { index });
                }
                Err(source) => return Err(GenerationError::InvalidReference { index, source }),
            }
        }

        let image_parts = parts.len();
        parts.push(Part::text(prompt));

        Ok(AdaptedRequest {
            request: GenerateContentRequest {
                contents: vec![Content { parts }],
                generation_config: self.sampling.generation_config(),
            },
            warnings,
            image_parts,
        })
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
