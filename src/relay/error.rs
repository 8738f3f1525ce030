//! Errors reported before any fragment is sent

use crate::api::ProviderError;
use crate::prompt::ValidationError;
use axum::extract::rejection::QueryRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// JSON body of every non-streamed error response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: String,
}

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("Invalid request body: {0}")]
    Body(#[from] serde_json::Error),

    #[error("Invalid query: {0}")]
    Query(String),

    #[error("GEMINI_API_KEY is not configured")]
    NotConfigured,

    #[error("{0}")]
    Upstream(ProviderError),
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::Validation(_) | RelayError::Body(_) | RelayError::Query(_) => {
                StatusCode::BAD_REQUEST
            }
            RelayError::NotConfigured => StatusCode::INTERNAL_SERVER_ERROR,
            RelayError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<ProviderError> for RelayError {
    fn from(err: ProviderError) -> Self {
        if err.is_config() {
            RelayError::NotConfigured
        } else {
            RelayError::Upstream(err)
        }
    }
}

impl From<QueryRejection> for RelayError {
    fn from(rejection: QueryRejection) -> Self {
        RelayError::Query(rejection.body_text())
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Relay request failed: {}", self);
        }
        let envelope = ErrorEnvelope {
            error: self.to_string(),
        };
        (status, Json(envelope)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            RelayError::from(ValidationError::MissingField("code")).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(RelayError::NotConfigured.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            RelayError::from(ProviderError::Config).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            RelayError::from(ProviderError::Provider("down".into())).status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_query_error_is_bad_request() {
        let err = RelayError::Query("unknown variant `bogus`".into());
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Invalid query: unknown variant `bogus`");
    }

    #[test]
    fn test_validation_message_passthrough() {
        let err = RelayError::from(ValidationError::MissingField("errorMessage"));
        assert_eq!(err.to_string(), "Missing errorMessage field");
    }
}
