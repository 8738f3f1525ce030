//! Prompt builders for every AI-backed feature
//!
//! Each feature has a request type deserialized from the endpoint's JSON
//! body and a fixed instruction template. Rendering is pure: the same
//! request always produces the same [`PromptSpec`]. Optional fields add an
//! instruction clause only when they carry text; absent fields leave no
//! trace in the prompt.

mod features;
mod kinds;
mod system;

pub use features::{
    AnalyticsData, AnalyticsRequest, ChatRequest, DebugRequest, DeployRequest, DocSection,
    DocsRequest, ExplainRequest, ExplainTemplateRequest, GenerateRequest, SearchRequest,
    TemplateSummary, TestsRequest, TutorRequest,
};
pub use kinds::{CodeKind, Complexity, ContractLanguage, ExplainFocus, Network};

use crate::api::{GenerationSettings, Message, ProviderRequest};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Every feature served by the relay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FeatureKind {
    Generate,
    Explain,
    Debug,
    Tutor,
    Analytics,
    Search,
    Tests,
    Chat,
    Docs,
    Deploy,
    ExplainTemplate,
}

impl FeatureKind {
    pub const ALL: [FeatureKind; 11] = [
        FeatureKind::Generate,
        FeatureKind::Explain,
        FeatureKind::Debug,
        FeatureKind::Tutor,
        FeatureKind::Analytics,
        FeatureKind::Search,
        FeatureKind::Tests,
        FeatureKind::Chat,
        FeatureKind::Docs,
        FeatureKind::Deploy,
        FeatureKind::ExplainTemplate,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            FeatureKind::Generate => "generate",
            FeatureKind::Explain => "explain",
            FeatureKind::Debug => "debug",
            FeatureKind::Tutor => "tutor",
            FeatureKind::Analytics => "analytics",
            FeatureKind::Search => "search",
            FeatureKind::Tests => "tests",
            FeatureKind::Chat => "chat",
            FeatureKind::Docs => "docs",
            FeatureKind::Deploy => "deploy",
            FeatureKind::ExplainTemplate => "explain-template",
        }
    }

    /// HTTP path of the relay endpoint
    pub fn route(&self) -> &'static str {
        match self {
            FeatureKind::Generate => "/api/generate",
            FeatureKind::Explain => "/api/explain",
            FeatureKind::Debug => "/api/debug",
            FeatureKind::Tutor => "/api/tutor",
            FeatureKind::Analytics => "/api/analytics-insights",
            FeatureKind::Search => "/api/marketplace-search",
            FeatureKind::Tests => "/api/generate-tests",
            FeatureKind::Chat => "/api/chat",
            FeatureKind::Docs => "/api/docs-search",
            FeatureKind::Deploy => "/api/deploy-assistant",
            FeatureKind::ExplainTemplate => "/api/explain-template",
        }
    }

    /// JSON name of the field that must be non-empty
    pub fn primary_field(&self) -> &'static str {
        match self {
            FeatureKind::Generate => "prompt",
            FeatureKind::Explain => "code",
            FeatureKind::Debug => "errorMessage",
            FeatureKind::Tutor | FeatureKind::Analytics => "question",
            FeatureKind::Search | FeatureKind::Docs => "searchQuery",
            FeatureKind::Tests | FeatureKind::Deploy => "contractCode",
            FeatureKind::Chat => "message",
            FeatureKind::ExplainTemplate => "templateCode",
        }
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FeatureKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FeatureKind::ALL
            .into_iter()
            .find(|k| k.name() == s.to_lowercase())
            .ok_or_else(|| {
                let names: Vec<&str> = FeatureKind::ALL.iter().map(|k| k.name()).collect();
                format!("unknown feature '{}', expected one of: {}", s, names.join(", "))
            })
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Missing {0} field")]
    MissingField(&'static str),

    #[error("Invalid {field} field: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// Rendered instruction plus how the provider should sample it
#[derive(Debug, Clone, PartialEq)]
pub struct PromptSpec {
    pub system: Option<String>,
    pub history: Vec<Message>,
    pub instruction: String,
    pub settings: GenerationSettings,
}

impl PromptSpec {
    pub fn into_request(self) -> ProviderRequest {
        let mut request = ProviderRequest::new(self.instruction)
            .with_history(self.history)
            .with_settings(self.settings);
        request.system = self.system;
        request
    }
}

/// A feature request that can be validated and rendered.
///
/// Callers must call [`PromptSource::validate`] first; `build` assumes the
/// primary field is present.
pub trait PromptSource {
    const KIND: FeatureKind;

    fn validate(&self) -> Result<(), ValidationError>;

    fn build(&self) -> PromptSpec;
}

/// Reject a missing or whitespace-only required field
pub(crate) fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::MissingField(field))
    } else {
        Ok(())
    }
}

/// Optional text that actually carries content
pub(crate) fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// First `max_chars` characters of `text`
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Append a clause separated by a blank line
pub(crate) fn push_clause(prompt: &mut String, clause: &str) {
    if !prompt.is_empty() {
        prompt.push_str("\n\n");
    }
    prompt.push_str(clause);
}
