use std::io;

use thiserror::Error;

use crate::credential::CredentialError;
use crate::gemini::transport::TransportError;
use crate::normalizer::{FinishReason, Outcome};
use crate::reference::ReferenceError;

/// Upstream bodies quoted back to callers are cut to this many characters.
pub const MAX_DETAILS_CHARS: usize = 1000;

const MISSING_KEY_HINT: &str = "Get an API key at https://aistudio.google.com/apikey, then send it as \
     apiKey in the request body or save it via POST /save-api-key";
const KEY_OR_BILLING_HINT: &str =
    "Check that the API key is valid and that billing is enabled in Google AI Studio";
const PROMPT_HINT: &str = "Try a simpler, clearer English prompt such as \"Add sunglasses\" or \
     \"Change background to beach\"";
const REFERENCE_HINT: &str =
    "Send references as data:image/<subtype>;base64,<payload> or as bare base64";

/// Failure classes, each mapped to one HTTP status family by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    UpstreamTransport,
    UpstreamContentPolicy,
    UpstreamMalformed,
    LocalIo,
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("missing Gemini API key")]
    MissingCredential,

    #[error("prompt must not be empty")]
    EmptyPrompt,

    #[error("at most {max} reference images are supported, got {count}")]
    TooManyReferences { count: usize, max: usize },

    #[error("reference image {index} is invalid: {source}")]
    InvalidReference {
        index: usize,
        #[source]
        source: ReferenceError,
    },

    /// Gemini answered with a non-2xx status. `body` is already truncated.
    #[error("Gemini API call failed with status {status}")]
    UpstreamStatus { status: u16, body: String },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Gemini API returned an empty body")]
    EmptyBody,

    /// The model finished without producing images.
    #[error("{}", .reason.message())]
    Refused { reason: FinishReason, raw: String },

    #[error("{message}")]
    Malformed {
        message: &'static str,
        body: Option<String>,
    },

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error("failed to store generated image: {0}")]
    Io(#[from] io::Error),
}

impl GenerationError {
    pub(crate) fn malformed(message: &'static str, body: Option<&str>) -> Self {
        Self::Malformed {
            message,
            body: body.map(truncate_body),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingCredential
            | Self::EmptyPrompt
            | Self::TooManyReferences { .. }
            | Self::InvalidReference { .. }
            | Self::Credential(CredentialError::Empty) => ErrorKind::Validation,
            Self::UpstreamStatus { .. } | Self::Transport(_) | Self::EmptyBody => {
                ErrorKind::UpstreamTransport
            }
            Self::Refused { .. } => ErrorKind::UpstreamContentPolicy,
            Self::Malformed { .. } => ErrorKind::UpstreamMalformed,
            Self::Credential(_) | Self::Io(_) => ErrorKind::LocalIo,
        }
    }

    /// Upstream HTTP status, when Gemini answered at all.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            Self::UpstreamStatus { status, .. } => Some(*status),
            Self::Transport(TransportError::Connect(e)) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Actionable advice for the caller.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::MissingCredential => Some(MISSING_KEY_HINT),
            Self::UpstreamStatus {
                status: 400 | 401 | 403,
                ..
            } => Some(KEY_OR_BILLING_HINT),
            Self::InvalidReference { .. } => Some(REFERENCE_HINT),
            Self::Refused { .. } => Some(PROMPT_HINT),
            _ => None,
        }
    }

    /// Raw upstream text or low-level cause, truncated.
    pub fn details(&self) -> Option<String> {
        match self {
            Self::UpstreamStatus { body, .. } if !body.is_empty() => Some(body.clone()),
            Self::Malformed { body, .. } => body.clone(),
            Self::Transport(e) => Some(truncate_body(&e.to_string())),
            _ => None,
        }
    }

    /// The finish reason exactly as Gemini reported it.
    pub fn finish_reason(&self) -> Option<&str> {
        match self {
            Self::Refused { raw, .. } => Some(raw),
            _ => None,
        }
    }

    /// Classification of the upstream exchange, for errors that came from it.
    pub fn outcome(&self) -> Option<Outcome> {
        match self {
            Self::Refused { reason, .. } => Some(reason.outcome()),
            Self::Malformed { .. } => Some(Outcome::MalformedResponse),
            Self::UpstreamStatus { .. } | Self::Transport(_) | Self::EmptyBody => {
                Some(Outcome::TransportError)
            }
            _ => None,
        }
    }
}

/// First [`MAX_DETAILS_CHARS`] characters of `body`.
pub fn truncate_body(body: &str) -> String {
    match body.char_indices().nth(MAX_DETAILS_CHARS) {
        Some((cut, _)) => body[..cut].to_owned(),
        None => body.to_owned(),
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn truncation_respects_char_boundaries() {
        let long = "é".repeat(MAX_DETAILS_CHARS + 5);
        let cut = truncate_body(&long);
        assert_eq!(cut.chars().count(), MAX_DETAILS_CHARS);
        assert_eq!(truncate_body("short"), "short");
    }

    #[test]
    fn missing_credential_points_to_ai_studio() {
        let err = GenerationError::MissingCredential;
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.hint().unwrap().contains("https://aistudio.google.com/apikey"));
    }

    #[test]
    fn auth_statuses_carry_billing_hint() {
        for status in [400, 401, 403] {
            let err = GenerationError::UpstreamStatus {
                status,
                body: "denied".into(),
            };
            assert_eq!(err.kind(), ErrorKind::UpstreamTransport);
            assert_eq!(err.upstream_status(), Some(status));
            assert_eq!(err.hint(), Some(KEY_OR_BILLING_HINT));
            assert_eq!(err.details().as_deref(), Some("denied"));
        }

        let unavailable = GenerationError::UpstreamStatus {
            status: 503,
            body: String::new(),
        };
        assert!(unavailable.hint().is_none());
        assert!(unavailable.details().is_none());
    }

    #[test]
    fn refusal_reports_raw_reason_and_message() {
        let err = GenerationError::Refused {
            reason: FinishReason::Safety,
            raw: "SAFETY".into(),
        };
        assert_eq!(err.kind(), ErrorKind::UpstreamContentPolicy);
        assert_eq!(err.finish_reason(), Some("SAFETY"));
        assert_eq!(err.outcome(), Some(Outcome::ContentFiltered));
        assert_eq!(err.to_string(), FinishReason::Safety.message());
        assert!(err.hint().unwrap().contains("Add sunglasses"));
    }

    #[test]
    fn malformed_body_is_truncated() {
        let body = "x".repeat(MAX_DETAILS_CHARS * 2);
        let err = GenerationError::malformed("failed to parse Gemini response", Some(&body));
        assert_eq!(err.kind(), ErrorKind::UpstreamMalformed);
        assert_eq!(err.details().unwrap().len(), MAX_DETAILS_CHARS);
    }
}
