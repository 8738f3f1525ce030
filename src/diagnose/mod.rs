//! Classification of contract build, runtime and deployment errors
//!
//! Turns raw error text from cargo, an ink! contract or a node into a
//! category plus actionable hints and documentation links. The debug
//! feature uses it to sharpen its prompt; the CLI exposes it directly.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Compilation,
    Runtime,
    Deployment,
    Unknown,
}

impl ErrorKind {
    pub fn label(&self) -> &'static str {
        match self {
            ErrorKind::Compilation => "compilation",
            ErrorKind::Runtime => "runtime",
            ErrorKind::Deployment => "deployment",
            ErrorKind::Unknown => "unknown",
        }
    }

    fn classify(lower: &str) -> Self {
        const COMPILATION: &[&str] = &["compilation", "cargo", "rustc", "error[e"];
        const RUNTIME: &[&str] = &["runtime", "execution", "panicked"];
        const DEPLOYMENT: &[&str] = &["deploy", "instantiate"];

        if COMPILATION.iter().any(|k| lower.contains(k)) {
            ErrorKind::Compilation
        } else if RUNTIME.iter().any(|k| lower.contains(k)) {
            ErrorKind::Runtime
        } else if DEPLOYMENT.iter().any(|k| lower.contains(k)) {
            ErrorKind::Deployment
        } else {
            ErrorKind::Unknown
        }
    }
}

/// A known error pattern and what to do about it
struct Rule {
    needle: &'static str,
    suggestions: &'static [&'static str],
    doc: &'static str,
}

const INK_DOCS: &str = "https://use.ink/";
const INK_CONTRACT_DOCS: &str = "https://use.ink/basics/contracts";
const POLKADOT_JS_DOCS: &str = "https://polkadot.js.org/docs/";

const RULES: &[Rule] = &[
    Rule {
        needle: "cannot find",
        suggestions: &[
            "Check that every import path is correct",
            "Make sure the dependency is declared in Cargo.toml",
        ],
        doc: "https://use.ink/getting-started/creating-an-ink-project",
    },
    Rule {
        needle: "mismatched types",
        suggestions: &[
            "Check the data types used in the function",
            "Make sure arguments match the expected parameter types",
        ],
        doc: INK_CONTRACT_DOCS,
    },
    Rule {
        needle: "borrow",
        suggestions: &[
            "Review references and ownership of the value",
            "Consider clone() if a second owner is really needed",
        ],
        doc: "https://doc.rust-lang.org/book/ch04-00-understanding-ownership.html",
    },
    Rule {
        needle: "ink!",
        suggestions: &[
            "Check that the ink! attributes are correct",
            "Make sure the ink! version matches your toolchain",
        ],
        doc: INK_DOCS,
    },
    Rule {
        needle: "insufficient balance",
        suggestions: &[
            "Check that the account holds enough tokens",
            "Review the token transfer logic",
        ],
        doc: INK_CONTRACT_DOCS,
    },
    Rule {
        needle: "permission denied",
        suggestions: &[
            "Check the permissions required by the message",
            "Make sure the caller has the required role",
        ],
        doc: INK_CONTRACT_DOCS,
    },
    Rule {
        needle: "overflow",
        suggestions: &[
            "Check the arithmetic operations",
            "Use checked_add() and friends to prevent overflow",
        ],
        doc: "https://doc.rust-lang.org/std/primitive.u32.html#method.checked_add",
    },
    Rule {
        needle: "insufficient funds",
        suggestions: &[
            "Make sure the deployer has enough tokens for the deposit",
            "Check the account balance",
        ],
        doc: POLKADOT_JS_DOCS,
    },
    Rule {
        needle: "gas limit",
        suggestions: &[
            "Raise the gas limit for the deployment",
            "Reduce the code's gas usage",
        ],
        doc: INK_CONTRACT_DOCS,
    },
    Rule {
        needle: "network",
        suggestions: &[
            "Check the connection to the node",
            "Try a different RPC endpoint",
        ],
        doc: POLKADOT_JS_DOCS,
    },
];

const FALLBACK_SUGGESTIONS: &[&str] = &[
    "Review the ink! documentation",
    "Check the code syntax",
];

/// Outcome of classifying one error message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnosis {
    pub kind: ErrorKind,
    pub message: String,
    pub suggestions: Vec<String>,
    pub doc_links: Vec<String>,
    /// Whether any specific rule matched
    pub matched: bool,
}

impl Diagnosis {
    /// Worth mentioning to the model: a category or a specific hint
    pub fn is_recognized(&self) -> bool {
        self.kind != ErrorKind::Unknown || self.matched
    }
}

pub fn diagnose(error_message: &str) -> Diagnosis {
    let lower = error_message.to_lowercase();
    let kind = ErrorKind::classify(&lower);

    let mut suggestions = Vec::new();
    let mut doc_links: Vec<String> = Vec::new();

    for rule in RULES.iter().filter(|r| lower.contains(r.needle)) {
        suggestions.extend(rule.suggestions.iter().map(|s| s.to_string()));
        if !doc_links.iter().any(|d| d == rule.doc) {
            doc_links.push(rule.doc.to_string());
        }
    }

    let matched = !suggestions.is_empty();
    if !matched {
        suggestions.extend(FALLBACK_SUGGESTIONS.iter().map(|s| s.to_string()));
        doc_links.push(INK_DOCS.to_string());
    }

    Diagnosis {
        kind,
        message: error_message.to_string(),
        suggestions,
        doc_links,
        matched,
    }
}
