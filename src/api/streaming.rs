//! Streaming response support for providers

use super::{ProviderError, ProviderRequest, TokenUsage};
use async_trait::async_trait;
use tokio::sync::mpsc;

/// A chunk of a streaming response
#[derive(Debug, Clone, PartialEq)]
pub enum StreamChunk {
    /// A text delta (partial content), never empty
    TextDelta(String),
    /// Stream completed with final usage stats
    Done(TokenUsage),
    /// An error occurred during streaming
    Error(String),
}

/// A provider that turns one request into a lazy sequence of fragments.
///
/// Implementations must check `is_configured` before touching the network
/// and must not retry: a failed call is reported to the caller as is.
#[async_trait]
pub trait StreamingProvider: Send + Sync {
    /// Whether a credential is present
    fn is_configured(&self) -> bool;

    /// Model identifier used for streaming requests
    fn model(&self) -> &str;

    /// Send a request and return a channel of streaming chunks.
    /// The receiver yields TextDelta chunks as they arrive, followed by
    /// exactly one Done or Error chunk.
    async fn send_streaming(
        &self,
        request: ProviderRequest,
    ) -> Result<mpsc::Receiver<StreamChunk>, ProviderError>;

    /// Issue a minimal non-streaming request against `model`
    async fn probe(&self, model: &str) -> Result<(), ProviderError>;
}
