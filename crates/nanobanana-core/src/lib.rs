//! nanobanana-core – the request/response plumbing behind the nanobanana
//! server.
//!
//! The crate turns a prompt plus reference images into a Gemini
//! `generateContent` call and turns the answer back into a list of stored
//! images:
//!
//! ```text
//! GenerationRequest ─► PromptAdapter ─► Transport ─► ResponseNormalizer ─► Vec<GeneratedImage>
//!                                                         │
//!                                                         └─► MediaStore (disk)
//! ```
//!
//! [`Generator`] sequences the pipeline. Credentials are never global: the
//! caller resolves an [`ApiKey`] through a [`CredentialProvider`] and hands it
//! over with each request.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use nanobanana_core::{ApiKey, GenerationRequest, Generator, HttpTransport, MediaStore};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let media = Arc::new(MediaStore::open("uploads", "http://localhost:3000/uploads").await?);
//! let transport = HttpTransport::new("https://generativelanguage.googleapis.com/v1beta", None)?;
//! let generator = Generator::new(Arc::new(transport), media, "gemini-2.5-flash-image-preview");
//!
//! let generation = generator
//!     .generate(GenerationRequest {
//!         prompt: "Add sunglasses".into(),
//!         references: vec![],
//!         credential: ApiKey::new("my-key"),
//!         num_images: None,
//!     })
//!     .await?;
//! println!("{}", generation.images[0].retrieval_url);
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod credential;
pub mod error;
pub mod gemini;
pub mod media;
pub mod normalizer;
pub mod orchestrator;
pub mod reference;

pub use adapter::{AdaptedRequest, AdapterWarning, MAX_REFERENCE_IMAGES, PromptAdapter, SamplingConfig};
pub use credential::{ApiKey, CredentialError, CredentialProvider, FileCredentialStore, PerRequestCredential};
pub use error::{ErrorKind, GenerationError};
pub use gemini::transport::{HttpTransport, RawResponse, Transport, TransportError};
pub use media::{MediaStore, StoredMedia};
pub use normalizer::{FinishReason, GeneratedImage, Outcome, ResponseNormalizer};
pub use orchestrator::{Generation, GenerationRequest, Generator};
pub use reference::{ReferenceError, ReferenceImage};
