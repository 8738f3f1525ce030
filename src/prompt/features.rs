//! Per-feature request bodies and their templates

use super::kinds::{CodeKind, Complexity, ContractLanguage, ExplainFocus, Network};
use super::{
    present, push_clause, require, system, truncate_chars, FeatureKind, PromptSource, PromptSpec,
    ValidationError,
};
use crate::api::{GenerationSettings, Message};
use crate::diagnose::diagnose;
use serde::{Deserialize, Serialize};

const EXPLAIN_CODE_LIMIT: usize = 3000;
const DEBUG_CODE_LIMIT: usize = 2000;

fn settings(temperature: f32, max_output_tokens: u32) -> GenerationSettings {
    GenerationSettings::default()
        .with_temperature(temperature)
        .with_max_output_tokens(max_output_tokens)
}

fn fenced(fence: &str, code: &str) -> String {
    format!("```{}\n{}\n```", fence, code)
}

fn numbered(title: &str, items: &[&str]) -> String {
    let mut out = title.to_string();
    for (i, item) in items.iter().enumerate() {
        out.push_str(&format!("\n{}. {}", i + 1, item));
    }
    out
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerateRequest {
    pub prompt: String,
    pub contract_type: String,
    pub complexity: Option<String>,
    pub features: Vec<String>,
    pub language: Option<String>,
}

impl PromptSource for GenerateRequest {
    const KIND: FeatureKind = FeatureKind::Generate;

    fn validate(&self) -> Result<(), ValidationError> {
        require("prompt", &self.prompt)?;
        require("contractType", &self.contract_type)
    }

    fn build(&self) -> PromptSpec {
        let language = present(&self.language)
            .map(ContractLanguage::from_hint)
            .unwrap_or(ContractLanguage::Ink);
        let complexity = present(&self.complexity).map(Complexity::from_hint);
        let name = language.display_name();

        let mut prompt = format!(
            "Generate a COMPLETE, WORKING {} smart contract of type \"{}\".\n\nUSER REQUIREMENTS:\n{}",
            name,
            self.contract_type.trim(),
            self.prompt.trim()
        );

        if present(&self.language).is_some() {
            push_clause(&mut prompt, &format!("Target language: {}", name));
        }
        if let Some(level) = complexity {
            push_clause(
                &mut prompt,
                &format!("{}\nComplexity level: {}", level.description(), level.label()),
            );
        }
        let features: Vec<&str> = self
            .features
            .iter()
            .map(|f| f.trim())
            .filter(|f| !f.is_empty())
            .collect();
        if !features.is_empty() {
            push_clause(&mut prompt, &format!("Requested features: {}", features.join(", ")));
        }

        push_clause(
            &mut prompt,
            &format!(
                "Output ONLY valid {} code, starting directly with the contract structure. \
                 No explanations outside code comments, no markdown prose, never empty or partial code.",
                name
            ),
        );

        let max_tokens = complexity
            .unwrap_or(Complexity::Intermediate)
            .max_output_tokens();

        PromptSpec {
            system: Some(system::generate(language)),
            history: Vec::new(),
            instruction: prompt,
            settings: settings(0.7, max_tokens),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExplainRequest {
    pub code: String,
    pub focus: Option<ExplainFocus>,
}

impl PromptSource for ExplainRequest {
    const KIND: FeatureKind = FeatureKind::Explain;

    fn validate(&self) -> Result<(), ValidationError> {
        require("code", &self.code)
    }

    fn build(&self) -> PromptSpec {
        let kind = CodeKind::detect(&self.code);

        let mut prompt = format!("Explain this {} code", kind.label());
        if let Some(focus) = self.focus {
            prompt.push_str(&format!(" with a focus on {}", focus.description()));
        }
        prompt.push_str(":\n\n");
        prompt.push_str(&fenced(
            kind.fence(),
            truncate_chars(&self.code, EXPLAIN_CODE_LIMIT),
        ));

        push_clause(
            &mut prompt,
            &numbered(
                "REQUIREMENTS:",
                &[
                    "A clear, detailed explanation of the code",
                    "A description of each important component and function",
                    "The execution flow and logic",
                    self.focus.unwrap_or_default().requirement(),
                    "Usage examples where relevant",
                ],
            ),
        );

        PromptSpec {
            system: Some(system::EXPLAIN.to_string()),
            history: Vec::new(),
            instruction: prompt,
            settings: settings(0.7, 4096),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DebugRequest {
    pub error_message: String,
    pub code: Option<String>,
    pub context: Option<String>,
}

impl PromptSource for DebugRequest {
    const KIND: FeatureKind = FeatureKind::Debug;

    fn validate(&self) -> Result<(), ValidationError> {
        require("errorMessage", &self.error_message)
    }

    fn build(&self) -> PromptSpec {
        let code = present(&self.code);
        let kind = code.map(CodeKind::detect).unwrap_or(CodeKind::Generic);

        let mut prompt = format!(
            "Debug this {} error.\n\nERROR:\n{}",
            kind.label(),
            self.error_message.trim()
        );

        if let Some(code) = code {
            push_clause(
                &mut prompt,
                &format!(
                    "CODE:\n{}",
                    fenced(kind.fence(), truncate_chars(code, DEBUG_CODE_LIMIT))
                ),
            );
        }
        if let Some(context) = present(&self.context) {
            push_clause(&mut prompt, &format!("CONTEXT: {}", context));
        }

        let diagnosis = diagnose(&self.error_message);
        if diagnosis.is_recognized() {
            let mut clause = format!("Detected error category: {}.", diagnosis.kind.label());
            if diagnosis.matched {
                clause.push_str("\nKnown hints for this error:");
                for hint in &diagnosis.suggestions {
                    clause.push_str(&format!("\n- {}", hint));
                }
            }
            push_clause(&mut prompt, &clause);
        }

        push_clause(
            &mut prompt,
            &numbered(
                "Provide a COMPLETE solution:",
                &[
                    "What the error means",
                    "Root cause",
                    "The specific fix",
                    "Corrected code",
                    "How to prevent it in future",
                    "Related best practices",
                ],
            ),
        );

        PromptSpec {
            system: Some(system::DEBUG.to_string()),
            history: Vec::new(),
            instruction: prompt,
            settings: settings(0.5, 3000),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TutorRequest {
    pub question: String,
    pub learning_path: Option<String>,
    pub progress: Option<u8>,
}

impl PromptSource for TutorRequest {
    const KIND: FeatureKind = FeatureKind::Tutor;

    fn validate(&self) -> Result<(), ValidationError> {
        require("question", &self.question)?;
        match self.progress {
            Some(p) if p > 100 => Err(ValidationError::InvalidField {
                field: "progress",
                reason: format!("{} is not a percentage", p),
            }),
            _ => Ok(()),
        }
    }

    fn build(&self) -> PromptSpec {
        let context = match present(&self.learning_path) {
            Some(path) => match self.progress {
                Some(p) => format!(
                    "The learner is on the \"{}\" learning path with {}% progress.",
                    path, p
                ),
                None => format!("The learner is on the \"{}\" learning path.", path),
            },
            None => "The learner is exploring the learning center.".to_string(),
        };

        let mut prompt = format!(
            "You are an expert Polkadot/Substrate tutor. {}\n\nStudent question: {}",
            context,
            self.question.trim()
        );
        push_clause(
            &mut prompt,
            &numbered(
                "Provide:",
                &[
                    "A clear, educational answer",
                    "Practical examples where relevant",
                    "Related concepts worth knowing",
                    "Recommended next steps in their learning",
                    "Further resources if needed",
                ],
            ),
        );

        PromptSpec {
            system: Some(system::ASSISTANT.to_string()),
            history: Vec::new(),
            instruction: prompt,
            settings: settings(0.7, 4096),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalyticsData {
    pub contracts_generated: Option<u64>,
    pub users_active: Option<u64>,
    pub time_saved: Option<String>,
    pub deployments: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalyticsRequest {
    pub question: String,
    pub analytics_data: Option<AnalyticsData>,
}

impl PromptSource for AnalyticsRequest {
    const KIND: FeatureKind = FeatureKind::Analytics;

    fn validate(&self) -> Result<(), ValidationError> {
        require("question", &self.question)
    }

    fn build(&self) -> PromptSpec {
        let mut prompt =
            "You are a data analyst specialised in blockchain developer platforms.".to_string();

        if let Some(data) = &self.analytics_data {
            push_clause(
                &mut prompt,
                &format!(
                    "Current platform data:\n- Contracts generated: {}\n- Active users: {}\n- Time saved: {}\n- Deployments: {}",
                    data.contracts_generated.unwrap_or(0),
                    data.users_active.unwrap_or(0),
                    present(&data.time_saved).unwrap_or("N/A"),
                    data.deployments.unwrap_or(0),
                ),
            );
        }

        push_clause(&mut prompt, &format!("User question: {}", self.question.trim()));
        push_clause(
            &mut prompt,
            &numbered(
                "Structure the analysis as:",
                &[
                    "Key insights on usage and adoption",
                    "Trends and user behaviour patterns",
                    "Specific, prioritised recommendations",
                    "Metrics and KPIs to track",
                    "Projections based on current trends",
                ],
            ),
        );

        PromptSpec {
            system: Some(system::ASSISTANT.to_string()),
            history: Vec::new(),
            instruction: prompt,
            settings: settings(0.7, 4096),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TemplateSummary {
    pub title: String,
    pub description: String,
    pub category: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchRequest {
    pub search_query: String,
    pub available_templates: Vec<TemplateSummary>,
}

impl PromptSource for SearchRequest {
    const KIND: FeatureKind = FeatureKind::Search;

    fn validate(&self) -> Result<(), ValidationError> {
        require("searchQuery", &self.search_query)
    }

    fn build(&self) -> PromptSpec {
        let mut prompt = format!(
            "You are an expert at finding and recommending smart contract templates.\n\nThe user is looking for: \"{}\"",
            self.search_query.trim()
        );

        if !self.available_templates.is_empty() {
            let listing: Vec<String> = self
                .available_templates
                .iter()
                .map(|t| {
                    format!(
                        "- {} ({}): {}. Tags: {}",
                        t.title,
                        t.category,
                        t.description,
                        t.tags.join(", ")
                    )
                })
                .collect();
            push_clause(
                &mut prompt,
                &format!("Available templates:\n{}", listing.join("\n")),
            );
        }

        push_clause(
            &mut prompt,
            &numbered(
                "Provide:",
                &[
                    "An interpretation of the search intent and its keywords",
                    "The most relevant templates, ranked, with justification",
                    "Categories and tags worth exploring",
                    "Alternative search terms",
                    "Complementary templates",
                ],
            ),
        );

        PromptSpec {
            system: Some(system::ASSISTANT.to_string()),
            history: Vec::new(),
            instruction: prompt,
            settings: settings(0.7, 4096),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TestsRequest {
    pub contract_code: String,
    pub contract_type: Option<String>,
}

impl PromptSource for TestsRequest {
    const KIND: FeatureKind = FeatureKind::Tests;

    fn validate(&self) -> Result<(), ValidationError> {
        require("contractCode", &self.contract_code)
    }

    fn build(&self) -> PromptSpec {
        let language = present(&self.contract_type)
            .map(ContractLanguage::from_hint)
            .unwrap_or(ContractLanguage::Ink);

        let mut prompt = format!(
            "You are an expert in smart contract testing. Generate COMPLETE, WORKING tests for this contract.\n\n{}\n\nTesting stack: {}",
            fenced(
                language.fence(),
                truncate_chars(&self.contract_code, EXPLAIN_CODE_LIMIT)
            ),
            language.test_context()
        );

        push_clause(
            &mut prompt,
            &numbered(
                "REQUIRED:",
                &[
                    "Constructor tests, if there is a constructor",
                    "Tests for every public function",
                    "Edge cases: boundary values and expected errors",
                    "Emitted events, if the contract has events",
                    "Validation and security checks",
                    "Success and failure paths",
                ],
            ),
        );
        push_clause(
            &mut prompt,
            "Output ONLY test code with every import it needs, no additional explanations.",
        );

        PromptSpec {
            system: Some(system::ASSISTANT.to_string()),
            history: Vec::new(),
            instruction: prompt,
            settings: settings(0.7, 4096),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChatRequest {
    pub message: String,
    pub history: Vec<Message>,
}

impl PromptSource for ChatRequest {
    const KIND: FeatureKind = FeatureKind::Chat;

    fn validate(&self) -> Result<(), ValidationError> {
        require("message", &self.message)
    }

    fn build(&self) -> PromptSpec {
        PromptSpec {
            system: Some(system::ASSISTANT.to_string()),
            history: self
                .history
                .iter()
                .filter(|m| !m.content.trim().is_empty())
                .cloned()
                .collect(),
            instruction: self.message.trim().to_string(),
            settings: settings(0.7, 4096),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DocSection {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DocsRequest {
    pub search_query: String,
    pub doc_sections: Vec<DocSection>,
}

impl PromptSource for DocsRequest {
    const KIND: FeatureKind = FeatureKind::Docs;

    fn validate(&self) -> Result<(), ValidationError> {
        require("searchQuery", &self.search_query)
    }

    fn build(&self) -> PromptSpec {
        let mut prompt = format!(
            "You are an expert in Polkadot/Substrate technical documentation.\n\nThe user is searching the documentation for: \"{}\"",
            self.search_query.trim()
        );

        if !self.doc_sections.is_empty() {
            let sections: Vec<String> = self
                .doc_sections
                .iter()
                .map(|s| format!("- {}: {}", s.title, s.description))
                .collect();
            push_clause(
                &mut prompt,
                &format!("Available sections:\n{}", sections.join("\n")),
            );
        }

        push_clause(
            &mut prompt,
            &numbered(
                "Provide:",
                &[
                    "What the user needs and the key concepts involved",
                    "The most relevant sections and a suggested reading order",
                    "An explanation of the concepts with complete code examples",
                    "Links to official documentation and tutorials",
                    "Implementation steps and best practices",
                ],
            ),
        );

        PromptSpec {
            system: Some(system::ASSISTANT.to_string()),
            history: Vec::new(),
            instruction: prompt,
            settings: settings(0.7, 4096),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeployRequest {
    pub contract_code: String,
    pub question: String,
}

impl PromptSource for DeployRequest {
    const KIND: FeatureKind = FeatureKind::Deploy;

    fn validate(&self) -> Result<(), ValidationError> {
        require("contractCode", &self.contract_code)?;
        require("question", &self.question)
    }

    fn build(&self) -> PromptSpec {
        let kind = CodeKind::detect(&self.contract_code);
        let network = Network::detect(&self.question);

        let target = match (network, kind) {
            (Some(n), _) => n.name(),
            (None, CodeKind::Solidity) => "an EVM network (Ethereum, Polygon, ...)",
            (None, _) => "Polkadot / Paseo Testnet",
        };

        let mut prompt = format!(
            "You are an expert assistant for deploying smart contracts.\n\n{} code:\n{}\n\nQuestion: {}",
            kind.label(),
            fenced(
                kind.fence(),
                truncate_chars(&self.contract_code, DEBUG_CODE_LIMIT)
            ),
            self.question.trim()
        );

        if let Some(network) = network {
            push_clause(&mut prompt, &network.facts());
        }
        push_clause(&mut prompt, &format!("Target network: {}", target));
        push_clause(
            &mut prompt,
            &numbered(
                "Provide a complete deployment guide:",
                &[
                    "Pre-deployment checks (build, tests, audit for mainnet)",
                    "Tooling and account setup",
                    "Step-by-step deployment commands",
                    "Verification after deployment",
                    "Common problems and how to solve them",
                ],
            ),
        );

        PromptSpec {
            system: Some(system::ASSISTANT.to_string()),
            history: Vec::new(),
            instruction: prompt,
            settings: settings(0.7, 4096),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExplainTemplateRequest {
    pub template_code: String,
    pub template_name: String,
}

impl PromptSource for ExplainTemplateRequest {
    const KIND: FeatureKind = FeatureKind::ExplainTemplate;

    fn validate(&self) -> Result<(), ValidationError> {
        require("templateCode", &self.template_code)?;
        require("templateName", &self.template_name)
    }

    fn build(&self) -> PromptSpec {
        let mut prompt = format!(
            "You are a smart contract expert. Explain the code template \"{}\" completely:\n\n{}",
            self.template_name.trim(),
            fenced("rust", truncate_chars(&self.template_code, EXPLAIN_CODE_LIMIT))
        );
        push_clause(
            &mut prompt,
            &numbered(
                "Cover:",
                &[
                    "Summary: what the template does and why",
                    "Structure: storage, events, functions",
                    "Each function with its parameters and return values",
                    "Use cases and how to customise it",
                    "Security considerations and validations included",
                ],
            ),
        );

        PromptSpec {
            system: Some(system::ASSISTANT.to_string()),
            history: Vec::new(),
            instruction: prompt,
            settings: settings(0.7, 4096),
        }
    }
}
