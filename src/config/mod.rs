//! Configuration management for the devkit relay
//!
//! Supports configuration via:
//! 1. Config file (~/.config/devkit-relay/config.toml)
//! 2. Environment variables (GEMINI_API_KEY, DEVKIT_PORT, etc.)
//! 3. CLI arguments (override file/env settings)

use crate::api::{GeminiConfig, API_KEY_ENV, DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::relay::RelaySettings;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Generative-AI provider
    pub provider: ProviderSettings,

    /// Relay HTTP server
    pub server: ServerSettings,

    /// Command-line client
    pub client: ClientSettings,
}

/// Gemini settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// API key (can also use GEMINI_API_KEY env var)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of the Generative Language API
    pub base_url: String,

    /// Model used for streaming requests
    pub model: String,

    /// Models probed by `models` and /api/check-models, in order
    pub candidate_models: Vec<String>,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            candidate_models: vec![
                "gemini-2.5-flash".to_string(),
                "gemini-2.5-pro".to_string(),
                "gemini-2.0-flash".to_string(),
                "gemini-1.5-flash".to_string(),
            ],
        }
    }
}

/// Relay server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,

    pub port: u16,

    /// Longest a single relayed stream may run
    pub max_duration_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            max_duration_secs: 60,
        }
    }
}

/// Client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// Relay the `ask` command talks to
    pub relay_url: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            relay_url: "http://127.0.0.1:3000".to_string(),
        }
    }
}

impl Config {
    /// Get default config file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("devkit-relay")
            .join("config.toml")
    }

    /// Load config from default location
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Self::default_path())
    }

    /// Load config from specific path
    pub fn load_from(path: PathBuf) -> Result<Self, ConfigError> {
        Ok(Self::load_file_from(path)?.with_env_overrides())
    }

    /// Load only what the default config file holds, for editing it in place
    pub fn load_file() -> Result<Self, ConfigError> {
        Self::load_file_from(Self::default_path())
    }

    /// Load a config file without environment overrides
    pub fn load_file_from(path: PathBuf) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Apply environment variable overrides
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from any variable source
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        // Provider
        if let Some(key) = lookup(API_KEY_ENV) {
            self.provider.api_key = Some(key);
        }
        if let Some(url) = lookup("GEMINI_BASE_URL") {
            self.provider.base_url = url;
        }
        if let Some(model) = lookup("GEMINI_MODEL") {
            self.provider.model = model;
        }

        // Server
        if let Some(host) = lookup("DEVKIT_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("DEVKIT_PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }

        // Client
        if let Some(url) = lookup("DEVKIT_RELAY_URL") {
            self.client.relay_url = url;
        }

        self
    }

    /// Save config to default location
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(Self::default_path())
    }

    /// Save config to specific path
    pub fn save_to(&self, path: PathBuf) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;

        Ok(())
    }

    /// Validate configuration.
    ///
    /// A missing API key is an error here so `config validate` can report
    /// it; the server itself still starts and answers 500 per request.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key().is_none() {
            return Err(ConfigError::MissingRequired(format!(
                "{} is not set (config provider.api_key or environment)",
                API_KEY_ENV
            )));
        }
        if self.provider.model.trim().is_empty() {
            return Err(ConfigError::Invalid("provider.model is empty".to_string()));
        }
        if self.server.max_duration_secs == 0 {
            return Err(ConfigError::Invalid(
                "server.max_duration_secs must be positive".to_string(),
            ));
        }
        self.server_addr()?;
        Ok(())
    }

    /// Get the Gemini API key, ignoring blank values
    pub fn api_key(&self) -> Option<String> {
        self.provider
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
    }

    pub fn server_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| {
                ConfigError::Invalid(format!(
                    "server address {}:{}: {}",
                    self.server.host, self.server.port, e
                ))
            })
    }

    pub fn gemini_config(&self) -> GeminiConfig {
        GeminiConfig {
            api_key: self.api_key(),
            model: self.provider.model.clone(),
            base_url: Some(self.provider.base_url.clone()),
        }
    }

    pub fn relay_settings(&self) -> RelaySettings {
        let mut candidate_models = self.provider.candidate_models.clone();
        if candidate_models.is_empty() {
            candidate_models.push(self.provider.model.clone());
        }
        RelaySettings {
            max_duration: Duration::from_secs(self.server.max_duration_secs),
            candidate_models,
        }
    }

    /// Copy safe to print, with the API key masked
    pub fn masked(&self) -> Self {
        let mut config = self.clone();
        if config.provider.api_key.is_some() {
            config.provider.api_key = Some("***".to_string());
        }
        config
    }

    /// Generate example config content
    pub fn example() -> String {
        let example = Config::default();
        toml::to_string_pretty(&example).unwrap_or_default()
    }
}

/// Builder for creating Config programmatically
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.provider.api_key = Some(key.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.provider.model = model.into();
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.provider.base_url = url.into();
        self
    }

    pub fn candidate_models(mut self, models: Vec<String>) -> Self {
        self.config.provider.candidate_models = models;
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.server.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    pub fn max_duration_secs(mut self, secs: u64) -> Self {
        self.config.server.max_duration_secs = secs;
        self
    }

    pub fn relay_url(mut self, url: impl Into<String>) -> Self {
        self.config.client.relay_url = url.into();
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
