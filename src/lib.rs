//! devkit-relay - Streaming AI assistance for smart-contract development
//!
//! A small HTTP relay that turns structured developer requests (generate a
//! contract, explain code, debug an error, write tests, ...) into prompts for
//! a generative-AI provider and streams the answer back fragment by fragment.
//!
//! ## Key Features
//!
//! - **Prompt Builder**: one validated request type per feature, rendered into
//!   provider instructions with feature-specific sampling settings
//! - **Provider Adapter**: Gemini streaming over SSE behind the `StreamingProvider` trait
//! - **Relay**: axum endpoints emitting `data: {"content": ...}` frames and a single `[DONE]`
//! - **Client**: incremental frame parser and `RelayClient` for consumers
//! - **Wallet**: session state over an external signing capability
//! - **Diagnosis**: offline classification of build, runtime and deployment errors

pub mod api;
pub mod client;
pub mod config;
pub mod diagnose;
pub mod prompt;
pub mod relay;
pub mod tui;
pub mod wallet;

pub use api::{GeminiConfig, GeminiProvider, ProviderError, StreamChunk, StreamingProvider};
pub use client::{consume, ClientError, Outcome, RelayClient};
pub use config::{Config, ConfigBuilder, ConfigError};
pub use diagnose::{diagnose, Diagnosis};
pub use prompt::{FeatureKind, PromptSource, PromptSpec, ValidationError};
pub use relay::{router, serve, AppState, RelayError, RelaySettings};
pub use wallet::{WalletCapability, WalletConnection, WalletError, WalletSession};
