//! Reference image input encodings.

use std::str::FromStr;

use thiserror::Error;

/// A caller-supplied reference image, classified by encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceImage {
    /// `data:image/<subtype>;base64,<payload>`.
    DataUri { mime: String, payload: String },
    /// Bare base64 with no media type; assumed to be JPEG.
    RawBase64 { payload: String },
    /// `http(s)://…` – Gemini does not fetch remote images, so these are
    /// never forwarded.
    RemoteUrl { href: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReferenceError {
    #[error("reference image is empty")]
    Empty,

    #[error("malformed data URI; expected data:image/<subtype>;base64,<payload>")]
    MalformedDataUri,
}

/// Media type assumed for [`ReferenceImage::RawBase64`].
pub const RAW_BASE64_MIME: &str = "image/jpeg";

impl ReferenceImage {
    /// Classify one reference string.
    pub fn parse(input: &str) -> Result<Self, ReferenceError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ReferenceError::Empty);
        }

        if input.starts_with("data:") {
            return parse_data_uri(input).ok_or(ReferenceError::MalformedDataUri);
        }

        if has_url_scheme(input) {
            return Ok(Self::RemoteUrl {
                href: input.to_owned(),
            });
        }

        Ok(Self::RawBase64 {
            payload: input.to_owned(),
        })
    }

    /// Media type to forward, or `None` for references that are not forwarded.
    pub fn mime_type(&self) -> Option<&str> {
        match self {
            Self::DataUri { mime, .. } => Some(mime),
            Self::RawBase64 { .. } => Some(RAW_BASE64_MIME),
            Self::RemoteUrl { .. } => None,
        }
    }
}

impl FromStr for ReferenceImage {
    type Err = ReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn parse_data_uri(input: &str) -> Option<ReferenceImage> {
    let rest = input.strip_prefix("data:image/")?;
    let (subtype, payload) = rest.split_once(";base64,")?;

    let valid_subtype = !subtype.is_empty()
        && subtype
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '+' | '.' | '-'));
    if !valid_subtype || payload.is_empty() {
        return None;
    }

    Some(ReferenceImage::DataUri {
        mime: format!("image/{subtype}"),
        payload: payload.to_owned(),
    })
}

fn has_url_scheme(input: &str) -> bool {
    ["http://", "https://"].iter().any(|scheme| {
        input
            .get(..scheme.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(scheme))
    })
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn data_uri_keeps_subtype_and_payload() {
        let parsed = ReferenceImage::parse("data:image/png;base64,iVBORw0KGgo=").unwrap();
        assert_eq!(
            parsed,
            ReferenceImage::DataUri {
                mime: "image/png".into(),
                payload: "iVBORw0KGgo=".into(),
            }
        );
        assert_eq!(parsed.mime_type(), Some("image/png"));
    }

    #[test]
    fn data_uri_accepts_structured_subtypes() {
        let parsed: ReferenceImage = "data:image/svg+xml;base64,PHN2Zy8+".parse().unwrap();
        assert_eq!(parsed.mime_type(), Some("image/svg+xml"));
    }

    #[test]
    fn malformed_data_uris_are_rejected() {
        for input in [
            "data:image/png,notbase64",
            "data:image/;base64,AAAA",
            "data:image/png;base64,",
            "data:text/plain;base64,AAAA",
            "data:image/p n g;base64,AAAA",
        ] {
            assert_eq!(
                ReferenceImage::parse(input),
                Err(ReferenceError::MalformedDataUri),
                "{input}"
            );
        }
    }

    #[test]
    fn urls_are_classified_case_insensitively() {
        for input in ["http://example.com/a.png", "HTTPS://example.com/b.jpg"] {
            assert!(matches!(
                ReferenceImage::parse(input),
                Ok(ReferenceImage::RemoteUrl { .. })
            ));
        }
        assert_eq!(
            ReferenceImage::parse("https://example.com/b.jpg").unwrap().mime_type(),
            None
        );
    }

    #[test]
    fn anything_else_is_raw_jpeg_base64() {
        let parsed = ReferenceImage::parse("  /9j/4AAQSkZJRg==\n").unwrap();
        assert_eq!(
            parsed,
            ReferenceImage::RawBase64 {
                payload: "/9j/4AAQSkZJRg==".into()
            }
        );
        assert_eq!(parsed.mime_type(), Some("image/jpeg"));
    }

    #[test]
    fn blank_input_is_empty() {
        assert_eq!(ReferenceImage::parse(" \t"), Err(ReferenceError::Empty));
    }
}
