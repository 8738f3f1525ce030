//! Enumerations the templates branch on

use serde::{Deserialize, Serialize};

/// Language a contract is generated in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractLanguage {
    Ink,
    Substrate,
    Solidity,
}

impl ContractLanguage {
    /// Interpret a free-form hint such as "ink", "Rust" or "solidity".
    /// Anything unrecognised means ink!.
    pub fn from_hint(hint: &str) -> Self {
        let hint = hint.to_lowercase();
        if hint.contains("solidity") {
            ContractLanguage::Solidity
        } else if hint.contains("rust") && !hint.contains("ink") {
            ContractLanguage::Substrate
        } else {
            ContractLanguage::Ink
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ContractLanguage::Ink => "ink!",
            ContractLanguage::Substrate => "Substrate (Rust)",
            ContractLanguage::Solidity => "Solidity",
        }
    }

    pub fn fence(&self) -> &'static str {
        match self {
            ContractLanguage::Solidity => "solidity",
            _ => "rust",
        }
    }

    /// Test framework named in test-generation prompts
    pub fn test_context(&self) -> &'static str {
        match self {
            ContractLanguage::Solidity => "Solidity with Hardhat/Foundry",
            ContractLanguage::Substrate => "Rust with Substrate testing",
            ContractLanguage::Ink => "ink! with ink_env::test",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Complexity {
    Simple,
    Intermediate,
    Advanced,
}

impl Complexity {
    pub fn from_hint(hint: &str) -> Self {
        let hint = hint.to_lowercase();
        if hint.contains("simple") {
            Complexity::Simple
        } else if hint.contains("advanced") || hint.contains("avanzado") {
            Complexity::Advanced
        } else {
            Complexity::Intermediate
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Complexity::Simple => "simple",
            Complexity::Intermediate => "intermediate",
            Complexity::Advanced => "advanced",
        }
    }

    pub fn max_output_tokens(&self) -> u32 {
        match self {
            Complexity::Simple => 2048,
            Complexity::Intermediate => 4096,
            Complexity::Advanced => 16384,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Complexity::Simple => {
                "SIMPLE LEVEL:\n\
                 - Implement the basic, essential functions\n\
                 - Clean code that is easy to follow\n\
                 - Basic security validations\n\
                 - The code must compile without errors"
            }
            Complexity::Intermediate => {
                "INTERMEDIATE LEVEL:\n\
                 - Implement every standard function for this contract type\n\
                 - Robust error handling and events for every important action\n\
                 - Complete security validations\n\
                 - Production-ready code"
            }
            Complexity::Advanced => {
                "ADVANCED LEVEL:\n\
                 - Complete implementation with every standard and advanced function\n\
                 - Gas and storage optimizations\n\
                 - Advanced security patterns (reentrancy protection, overflow checks)\n\
                 - Detailed events and exhaustive error handling\n\
                 - Inline documentation, mainnet-ready\n\
                 Generate the FULL code. Leave no function unimplemented."
            }
        }
    }
}

/// Kind of code detected in a user submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeKind {
    Ink,
    Solidity,
    Substrate,
    Generic,
}

impl CodeKind {
    pub fn detect(code: &str) -> Self {
        if code.contains("ink") {
            CodeKind::Ink
        } else if code.contains("pragma solidity") || code.contains("contract ") {
            CodeKind::Solidity
        } else if code.contains("pallet") {
            CodeKind::Substrate
        } else {
            CodeKind::Generic
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CodeKind::Ink => "ink!",
            CodeKind::Solidity => "Solidity",
            CodeKind::Substrate => "Substrate (Rust)",
            CodeKind::Generic => "smart contract",
        }
    }

    pub fn fence(&self) -> &'static str {
        match self {
            CodeKind::Solidity => "solidity",
            _ => "rust",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExplainFocus {
    #[default]
    General,
    Security,
    Optimization,
    Deployment,
}

impl ExplainFocus {
    pub fn description(&self) -> &'static str {
        match self {
            ExplainFocus::General => {
                "a general explanation of what the code does, how it works and its main components"
            }
            ExplainFocus::Security => {
                "a security review: potential vulnerabilities, security best practices and recommendations"
            }
            ExplainFocus::Optimization => {
                "possible optimizations: performance, gas and storage efficiency, and refactorings"
            }
            ExplainFocus::Deployment => {
                "a deployment guide: requirements, configuration and the steps to deploy"
            }
        }
    }

    pub fn requirement(&self) -> &'static str {
        match self {
            ExplainFocus::General => "Key concepts and best practices",
            ExplainFocus::Security => "Security analysis and vulnerabilities",
            ExplainFocus::Optimization => "Optimization opportunities",
            ExplainFocus::Deployment => "Deployment guide",
        }
    }
}

/// Networks the deployment assistant knows connection facts for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    Paseo,
    Westend,
    PolkadotMainnet,
}

impl Network {
    /// Detect the network a question is about
    pub fn detect(question: &str) -> Option<Self> {
        let question = question.to_lowercase();
        if question.contains("paseo") {
            Some(Network::Paseo)
        } else if question.contains("westend") {
            Some(Network::Westend)
        } else if question.contains("mainnet") {
            Some(Network::PolkadotMainnet)
        } else {
            None
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Network::Paseo => "Paseo Testnet",
            Network::Westend => "Westend Testnet",
            Network::PolkadotMainnet => "Polkadot Mainnet",
        }
    }

    pub fn rpc_endpoint(&self) -> &'static str {
        match self {
            Network::Paseo => "wss://paseo.rpc.amforc.com",
            Network::Westend => "wss://westend-rpc.polkadot.io",
            Network::PolkadotMainnet => "wss://rpc.polkadot.io",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Network::Paseo => "PAS",
            Network::Westend => "WND",
            Network::PolkadotMainnet => "DOT",
        }
    }

    pub fn decimals(&self) -> u8 {
        match self {
            Network::Paseo => 10,
            Network::Westend => 12,
            Network::PolkadotMainnet => 10,
        }
    }

    pub fn explorer(&self) -> &'static str {
        match self {
            Network::Paseo => "https://paseo.subscan.io/",
            Network::Westend => "https://westend.subscan.io/",
            Network::PolkadotMainnet => "https://polkadot.subscan.io/",
        }
    }

    pub fn is_testnet(&self) -> bool {
        !matches!(self, Network::PolkadotMainnet)
    }

    /// Connection facts appended to deployment prompts
    pub fn facts(&self) -> String {
        let mut facts = format!(
            "{} DETAILS:\n- RPC endpoint: {}\n- Symbol: {}\n- Decimals: {}\n- Explorer: {}\n- Polkadot.js Apps: https://polkadot.js.org/apps/?rpc={}",
            self.name().to_uppercase(),
            self.rpc_endpoint(),
            self.symbol(),
            self.decimals(),
            self.explorer(),
            self.rpc_endpoint(),
        );
        if self.is_testnet() {
            facts.push_str("\n- Type: testnet (tokens have no economic value)");
            facts.push_str("\n- Faucet: https://faucet.polkadot.io/");
        } else {
            facts.push_str("\n- Type: production network, DOT has real value");
        }
        facts
    }
}
