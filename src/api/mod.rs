//! Provider adapter for the generative-AI backend

mod gemini;
mod request;
mod response;
pub mod sse;
mod streaming;

pub use gemini::{GeminiConfig, GeminiProvider, DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use request::{GenerationSettings, Message, ProviderRequest, Role};
pub use response::{ModelProbe, TokenUsage};
pub use streaming::{StreamChunk, StreamingProvider};

use thiserror::Error;

/// Name of the credential every AI-backed operation requires
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("GEMINI_API_KEY is not configured")]
    Config,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Rate limited: retry after {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: u64 },

    #[error("Provider returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ProviderError {
    /// Missing credential, detected before any network call
    pub fn is_config(&self) -> bool {
        matches!(self, ProviderError::Config)
    }
}
