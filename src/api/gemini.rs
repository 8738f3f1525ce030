//! Google Gemini REST provider

use super::sse::{parse_sse_line, LineBuffer};
use super::streaming::{StreamChunk, StreamingProvider};
use super::{GenerationSettings, ProviderError, ProviderRequest, TokenUsage};
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Gemini specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// API key; `None` leaves the provider unconfigured
    pub api_key: Option<String>,
    /// Model used for streaming requests
    pub model: String,
    /// Base URL (default: https://generativelanguage.googleapis.com/v1beta)
    pub base_url: Option<String>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: None,
        }
    }
}

/// Gemini provider. Built once at startup and shared by reference.
pub struct GeminiProvider {
    config: GeminiConfig,
    client: Client,
}

impl GeminiProvider {
    pub fn new(config: GeminiConfig) -> Self {
        Self::with_client(config, Client::new())
    }

    pub fn with_client(config: GeminiConfig, client: Client) -> Self {
        Self { config, client }
    }

    fn base_url(&self) -> &str {
        self.config
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
    }

    fn api_key(&self) -> Result<&str, ProviderError> {
        self.config
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ProviderError::Config)
    }

    fn build_request(&self, request: &ProviderRequest) -> Value {
        let mut contents: Vec<Value> = request
            .history
            .iter()
            .map(|msg| {
                json!({
                    "role": msg.role.as_str(),
                    "parts": [{ "text": msg.content }]
                })
            })
            .collect();

        contents.push(json!({
            "role": "user",
            "parts": [{ "text": request.prompt }]
        }));

        let mut body = json!({
            "contents": contents,
            "generationConfig": generation_config(&request.settings),
        });

        if let Some(system) = &request.system {
            body["systemInstruction"] = json!({ "parts": [{ "text": system }] });
        }

        body
    }

    async fn post(
        &self,
        url: &str,
        api_key: &str,
        body: &Value,
    ) -> Result<Response, ProviderError> {
        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", api_key)
            .json(body)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(error_from_response(response).await)
        }
    }
}

fn generation_config(settings: &GenerationSettings) -> Value {
    json!({
        "temperature": settings.temperature,
        "topP": settings.top_p,
        "topK": settings.top_k,
        "maxOutputTokens": settings.max_output_tokens,
    })
}

/// Map a non-success response onto the error taxonomy
async fn error_from_response(response: Response) -> ProviderError {
    let status = response.status().as_u16();
    let error_text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&error_text)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or(error_text);

    match status {
        401 | 403 => ProviderError::Auth(message),
        429 => ProviderError::RateLimited {
            retry_after_secs: parse_retry_delay(&message).unwrap_or(60),
        },
        _ => ProviderError::Status { status, message },
    }
}

/// Extract the delay from messages like "Please retry in 35.5s."
fn parse_retry_delay(message: &str) -> Option<u64> {
    let rest = &message[message.find("retry in ")? + "retry in ".len()..];
    let end = rest.find('s')?;
    let secs: f64 = rest[..end].trim().parse().ok()?;
    Some(secs.ceil() as u64)
}

#[async_trait]
impl StreamingProvider for GeminiProvider {
    fn is_configured(&self) -> bool {
        self.api_key().is_ok()
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn send_streaming(
        &self,
        request: ProviderRequest,
    ) -> Result<mpsc::Receiver<StreamChunk>, ProviderError> {
        let api_key = self.api_key()?;

        let url = format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.base_url(),
            self.config.model
        );
        let body = self.build_request(&request);

        let response = self.post(&url, api_key, &body).await?;

        let (tx, rx) = mpsc::channel(64);

        tokio::spawn(async move {
            let mut stream = response.bytes_stream();
            let mut buffer = LineBuffer::new();
            let mut deltas = 0usize;

            while let Some(chunk_result) = stream.next().await {
                match chunk_result {
                    Ok(bytes) => {
                        buffer.push(&bytes);

                        // Process complete lines
                        while let Some(line) = buffer.next_line() {
                            for chunk in parse_sse_line(&line) {
                                let terminal = !matches!(chunk, StreamChunk::TextDelta(_));
                                if !terminal {
                                    deltas += 1;
                                }
                                if tx.send(chunk).await.is_err() {
                                    return; // Receiver dropped
                                }
                                if terminal {
                                    debug!("Gemini stream finished after {} deltas", deltas);
                                    return;
                                }
                            }
                        }
                    }
                    Err(e) => {
                        warn!("Gemini stream failed after {} deltas: {}", deltas, e);
                        let _ = tx
                            .send(StreamChunk::Error(format!("Stream error: {}", e)))
                            .await;
                        return;
                    }
                }
            }

            // A last line without trailing newline
            if let Some(line) = buffer.take_remainder() {
                for chunk in parse_sse_line(&line) {
                    let terminal = !matches!(chunk, StreamChunk::TextDelta(_));
                    if tx.send(chunk).await.is_err() || terminal {
                        return;
                    }
                }
            }

            // If stream ends without a finish reason, send Done
            let _ = tx.send(StreamChunk::Done(TokenUsage::default())).await;
        });

        Ok(rx)
    }

    async fn probe(&self, model: &str) -> Result<(), ProviderError> {
        let api_key = self.api_key()?;

        let url = format!("{}/models/{}:generateContent", self.base_url(), model);
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": "ping" }] }],
            "generationConfig": { "maxOutputTokens": 8 },
        });

        let response = self.post(&url, api_key, &body).await?;
        let json: Value = response.json().await?;

        if let Some(message) = json["error"]["message"].as_str() {
            return Err(ProviderError::Provider(message.to_string()));
        }
        if json["candidates"].as_array().map_or(true, |c| c.is_empty()) {
            return Err(ProviderError::Provider(format!(
                "{} returned no candidates",
                model
            )));
        }

        Ok(())
    }
}
