//! devkit-relay CLI - Serve the AI relay or talk to one from the terminal

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use devkit_relay::{
    api::{GeminiProvider, StreamingProvider, API_KEY_ENV},
    client::RelayClient,
    config::Config,
    diagnose::diagnose,
    prompt::FeatureKind,
    relay::{self, check_models, AppState},
    tui::{self, TerminalRenderer},
};
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "devkit-relay")]
#[command(about = "Streaming AI relay for smart-contract development")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity level (RUST_LOG takes precedence when set)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP relay
    Serve {
        /// Address to bind (default: server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (default: server.port)
        #[arg(short, long)]
        port: Option<u16>,

        /// Longest a single stream may run, in seconds
        #[arg(long)]
        max_duration: Option<u64>,
    },

    /// Send a request to a running relay and stream the answer
    Ask {
        /// Feature to use (generate, explain, debug, tutor, ...)
        feature: FeatureKind,

        /// Main text: the prompt, question, error message or search query
        text: Option<String>,

        /// File whose content fills the feature's code field
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Extra body fields as key=value (e.g. contractType=token)
        #[arg(short, long = "set", value_name = "KEY=VALUE")]
        fields: Vec<String>,

        /// Complete JSON body; other arguments are merged on top
        #[arg(long)]
        body: Option<String>,

        /// Request raw chunks instead of event frames
        #[arg(long)]
        raw: bool,

        /// Relay base URL (default: client.relay_url)
        #[arg(long)]
        relay_url: Option<String>,
    },

    /// Probe the candidate models against the provider directly
    Models,

    /// Classify an error message and suggest fixes, offline
    Diagnose {
        /// Error text as printed by cargo, the contract or the node
        text: String,
    },

    /// Manage configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Initialize configuration file with defaults
    Init {
        /// Overwrite existing config
        #[arg(long)]
        force: bool,
    },

    /// Show current configuration
    Show {
        /// Show only specific section (provider, server, client)
        #[arg(short, long)]
        section: Option<String>,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., provider.model, server.port)
        key: String,

        /// Value to set
        value: String,
    },

    /// Show configuration file path
    Path,

    /// Validate configuration
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    match EnvFilter::try_from_default_env() {
        Ok(filter) => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_target(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        Err(_) => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(log_level)
                .with_target(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }

    match cli.command {
        Commands::Serve {
            host,
            port,
            max_duration,
        } => {
            run_serve(host, port, max_duration).await?;
        }
        Commands::Ask {
            feature,
            text,
            file,
            fields,
            body,
            raw,
            relay_url,
        } => {
            run_ask(feature, text, file, fields, body, raw, relay_url).await?;
        }
        Commands::Models => {
            run_models().await?;
        }
        Commands::Diagnose { text } => {
            TerminalRenderer::new().render_diagnosis(&diagnose(&text));
        }
        Commands::Config(cmd) => {
            run_config_command(cmd).await?;
        }
    }

    Ok(())
}

async fn run_serve(
    host: Option<String>,
    port: Option<u16>,
    max_duration: Option<u64>,
) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(secs) = max_duration {
        config.server.max_duration_secs = secs;
    }

    let addr = config.server_addr()?;
    let provider = GeminiProvider::new(config.gemini_config());
    if provider.is_configured() {
        info!("Provider: Gemini ({})", provider.model());
    } else {
        warn!(
            "{} is not set; AI endpoints will answer 500 until it is configured",
            API_KEY_ENV
        );
    }

    let state = AppState::new(Arc::new(provider), config.relay_settings());
    relay::serve(addr, state).await?;

    Ok(())
}

async fn run_ask(
    feature: FeatureKind,
    text: Option<String>,
    file: Option<PathBuf>,
    fields: Vec<String>,
    body: Option<String>,
    raw: bool,
    relay_url: Option<String>,
) -> Result<()> {
    let config = Config::load()?;
    let relay_url = relay_url.unwrap_or(config.client.relay_url);

    let mut object = match body {
        Some(json) => {
            let parsed = serde_json::from_str::<Value>(&json).context("--body is not valid JSON")?;
            match parsed {
                Value::Object(map) => map,
                _ => bail!("--body must be a JSON object"),
            }
        }
        None => Map::new(),
    };

    if let Some(path) = file {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let Some(field) = code_field(feature) else {
            bail!("{} does not take a code file", feature);
        };
        object.insert(field.to_string(), Value::String(content));
    }
    if let Some(text) = text {
        object.insert(text_field(feature).to_string(), Value::String(text));
    }
    for pair in fields {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("Invalid field '{}', expected KEY=VALUE", pair);
        };
        // Numbers and JSON literals keep their type, anything else is a string
        let value = serde_json::from_str(value)
            .unwrap_or_else(|_| Value::String(value.to_string()));
        object.insert(key.to_string(), value);
    }

    let client = RelayClient::new(relay_url);
    let renderer = TerminalRenderer::new();
    let outcome = tui::ask(&client, &renderer, feature, &Value::Object(object), raw).await?;

    if !outcome.is_answer() {
        std::process::exit(1);
    }
    Ok(())
}

/// Body field filled by `--file`
fn code_field(feature: FeatureKind) -> Option<&'static str> {
    match feature {
        FeatureKind::Explain | FeatureKind::Debug => Some("code"),
        FeatureKind::Tests | FeatureKind::Deploy => Some("contractCode"),
        FeatureKind::ExplainTemplate => Some("templateCode"),
        _ => None,
    }
}

/// Body field filled by the positional text
fn text_field(feature: FeatureKind) -> &'static str {
    match feature {
        FeatureKind::Deploy => "question",
        FeatureKind::ExplainTemplate => "templateName",
        _ => feature.primary_field(),
    }
}

async fn run_models() -> Result<()> {
    let config = Config::load()?;
    let provider = GeminiProvider::new(config.gemini_config());
    let renderer = TerminalRenderer::new();

    if !provider.is_configured() {
        renderer.render_error(&format!("{} is not configured", API_KEY_ENV));
        return Ok(());
    }

    let settings = config.relay_settings();
    let report = check_models(&provider, &settings.candidate_models).await;
    renderer.render_model_report(&report);

    Ok(())
}

async fn run_config_command(cmd: ConfigCommands) -> Result<()> {
    match cmd {
        ConfigCommands::Init { force } => {
            config_init(force)?;
        }
        ConfigCommands::Show { section } => {
            config_show(section)?;
        }
        ConfigCommands::Set { key, value } => {
            config_set(&key, &value)?;
        }
        ConfigCommands::Path => {
            config_path();
        }
        ConfigCommands::Validate => {
            config_validate()?;
        }
    }
    Ok(())
}

fn config_init(force: bool) -> Result<()> {
    let path = Config::default_path();

    if path.exists() && !force {
        println!("Configuration file already exists at: {}", path.display());
        println!("Use --force to overwrite");
        return Ok(());
    }

    Config::default().save()?;

    println!("Configuration file created at: {}", path.display());
    println!();
    println!("Next steps:");
    println!("  1. Set your API key:");
    println!("     devkit-relay config set provider.api_key <key>");
    println!("     or export {}=<key>", API_KEY_ENV);
    println!("  2. Start the relay:");
    println!("     devkit-relay serve");

    Ok(())
}

fn config_show(section: Option<String>) -> Result<()> {
    let config = Config::load()?.masked();

    let display = if let Some(sec) = section {
        match sec.to_lowercase().as_str() {
            "provider" => toml::to_string_pretty(&config.provider)?,
            "server" => toml::to_string_pretty(&config.server)?,
            "client" => toml::to_string_pretty(&config.client)?,
            _ => {
                println!("Unknown section: {}", sec);
                println!("Available: provider, server, client");
                return Ok(());
            }
        }
    } else {
        toml::to_string_pretty(&config)?
    };

    println!("{}", display);

    println!("\n--- Environment Variables ---");
    println!(
        "{}: {}",
        API_KEY_ENV,
        if std::env::var(API_KEY_ENV).is_ok() { "set" } else { "not set" }
    );
    for name in ["GEMINI_MODEL", "DEVKIT_HOST", "DEVKIT_PORT", "DEVKIT_RELAY_URL"] {
        println!(
            "{}: {}",
            name,
            std::env::var(name).unwrap_or_else(|_| "not set".to_string())
        );
    }

    Ok(())
}

fn config_set(key: &str, value: &str) -> Result<()> {
    // Edit the file as written; environment overrides stay out of it
    let mut config = Config::load_file()?;

    let Some((section, field)) = key.split_once('.') else {
        println!("Invalid key format. Use: section.key (e.g., provider.model)");
        return Ok(());
    };

    match section {
        "provider" => match field {
            "api_key" => config.provider.api_key = Some(value.to_string()),
            "base_url" => config.provider.base_url = value.to_string(),
            "model" => config.provider.model = value.to_string(),
            "candidate_models" => {
                config.provider.candidate_models = value
                    .split(',')
                    .map(|m| m.trim().to_string())
                    .filter(|m| !m.is_empty())
                    .collect()
            }
            _ => {
                println!("Unknown provider field: {}", field);
                println!("Available: api_key, base_url, model, candidate_models");
                return Ok(());
            }
        },
        "server" => match field {
            "host" => config.server.host = value.to_string(),
            "port" => config.server.port = value.parse()?,
            "max_duration_secs" => config.server.max_duration_secs = value.parse()?,
            _ => {
                println!("Unknown server field: {}", field);
                println!("Available: host, port, max_duration_secs");
                return Ok(());
            }
        },
        "client" => match field {
            "relay_url" => config.client.relay_url = value.to_string(),
            _ => {
                println!("Unknown client field: {}", field);
                return Ok(());
            }
        },
        _ => {
            println!("Unknown section: {}", section);
            println!("Available: provider, server, client");
            return Ok(());
        }
    }

    config.save()?;
    println!("Set {} = {}", key, if field == "api_key" { "***" } else { value });

    Ok(())
}

fn config_path() {
    let path = Config::default_path();
    println!("{}", path.display());

    if path.exists() {
        println!("(file exists)");
    } else {
        println!("(file does not exist - run 'config init' to create)");
    }
}

fn config_validate() -> Result<()> {
    let config = Config::load()?;

    match config.validate() {
        Ok(()) => {
            println!("Configuration is valid!");
            println!();
            println!("  Provider: Gemini (model: {})", config.provider.model);
            println!(
                "  Relay:    http://{}:{} (max stream {}s)",
                config.server.host, config.server.port, config.server.max_duration_secs
            );
            println!("  Client:   {}", config.client.relay_url);
        }
        Err(e) => {
            println!("Configuration validation failed:");
            println!("  {}", e);
            println!();
            println!("To fix, either:");
            println!("  1. Set the key in config: devkit-relay config set provider.api_key <key>");
            println!("  2. Set the environment variable: export {}=<key>", API_KEY_ENV);
        }
    }

    Ok(())
}
