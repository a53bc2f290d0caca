//! Google Gemini `generateContent` wire types and HTTP transport.

pub mod transport;
pub mod types;
