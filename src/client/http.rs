//! HTTP client for a running relay

use super::{consume, consume_raw, Outcome};
use crate::prompt::FeatureKind;
use crate::relay::ErrorEnvelope;
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Relay rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Failed to decode relay response: {0}")]
    Decode(String),
}

pub struct RelayClient {
    base_url: String,
    http: Client,
}

impl RelayClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, http: Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, feature: FeatureKind, raw: bool) -> String {
        let mut url = format!("{}{}", self.base_url, feature.route());
        if raw {
            url.push_str("?framing=raw");
        }
        url
    }

    /// POST `body` to a feature endpoint and stream the answer through
    /// `on_fragment`.
    ///
    /// Rejections sent before streaming (validation, missing credential,
    /// upstream failure in raw mode) come back as `ClientError::Rejected`.
    pub async fn stream<B, F>(
        &self,
        feature: FeatureKind,
        body: &B,
        raw: bool,
        on_fragment: F,
    ) -> Result<Outcome, ClientError>
    where
        B: Serialize + ?Sized,
        F: FnMut(&str),
    {
        let url = self.url(feature, raw);
        debug!("POST {}", url);

        let response = self.http.post(&url).json(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<ErrorEnvelope>(&text) {
                Ok(envelope) => envelope.error,
                Err(_) if text.is_empty() => {
                    return Err(ClientError::Decode(format!("empty {} response", status)))
                }
                Err(_) => text,
            };
            return Err(ClientError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let outcome = if raw {
            consume_raw(response.bytes_stream(), on_fragment).await
        } else {
            consume(response.bytes_stream(), on_fragment).await
        };
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_building() {
        let client = RelayClient::new("http://127.0.0.1:3000/");
        assert_eq!(client.base_url(), "http://127.0.0.1:3000");
        assert_eq!(
            client.url(FeatureKind::Debug, false),
            "http://127.0.0.1:3000/api/debug"
        );
        assert_eq!(
            client.url(FeatureKind::Tests, true),
            "http://127.0.0.1:3000/api/generate-tests?framing=raw"
        );
    }

    #[test]
    fn test_rejected_message() {
        let err = ClientError::Rejected {
            status: 400,
            message: "Missing code field".into(),
        };
        assert_eq!(
            err.to_string(),
            "Relay rejected the request (400): Missing code field"
        );
    }
}
