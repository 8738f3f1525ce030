//! HTTP handlers for the AI-backed features

use super::error::RelayError;
use super::pump::{error_frames, spawn_event_pump, spawn_raw_pump};
use super::AppState;
use crate::prompt::PromptSource;
use axum::body::{Body, Bytes};
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use futures_util::StreamExt;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::convert::Infallible;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};

/// Response encoding selected with `?framing=`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Framing {
    #[default]
    Event,
    Raw,
}

#[derive(Debug, Default, Deserialize)]
pub struct RelayQuery {
    #[serde(default)]
    pub framing: Framing,
}

/// Decode a JSON body; an empty body counts as `{}` so validation names
/// the missing field
fn parse_body<R: DeserializeOwned + Default>(body: &[u8]) -> Result<R, RelayError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(R::default());
    }
    Ok(serde_json::from_slice(body)?)
}

fn event_response(body: Body) -> Response {
    (
        [
            (CONTENT_TYPE, "text/event-stream"),
            (CACHE_CONTROL, "no-cache"),
        ],
        body,
    )
        .into_response()
}

fn raw_response(body: Body) -> Response {
    (
        [
            (CONTENT_TYPE, "text/plain; charset=utf-8"),
            (CACHE_CONTROL, "no-cache"),
        ],
        body,
    )
        .into_response()
}

/// Validate, check the credential, then relay the provider's fragments.
///
/// Nothing reaches the provider unless both checks pass. A bad `?framing=`
/// value is rejected with the same JSON envelope as a bad body.
pub async fn relay_feature<R>(
    State(state): State<AppState>,
    query: Result<Query<RelayQuery>, QueryRejection>,
    body: Bytes,
) -> Result<Response, RelayError>
where
    R: PromptSource + DeserializeOwned + Default + Send + 'static,
{
    let Query(query) = query?;
    let request: R = parse_body(&body)?;
    request.validate()?;

    if !state.provider.is_configured() {
        return Err(RelayError::NotConfigured);
    }

    let spec = request.build();
    info!(
        "Relaying {} request to {} ({:?} framing)",
        R::KIND,
        state.provider.model(),
        query.framing
    );

    let max_duration = state.settings.max_duration;
    let upstream = match state.provider.send_streaming(spec.into_request()).await {
        Ok(rx) => rx,
        Err(e) if e.is_config() => return Err(RelayError::NotConfigured),
        Err(e) => {
            warn!("Provider call for {} failed: {}", R::KIND, e);
            return match query.framing {
                Framing::Event => Ok(event_response(Body::from(error_frames(&e.to_string())))),
                Framing::Raw => Err(RelayError::Upstream(e)),
            };
        }
    };

    let response = match query.framing {
        Framing::Event => {
            let frames = spawn_event_pump(upstream, max_duration);
            let stream = ReceiverStream::new(frames).map(Ok::<_, Infallible>);
            event_response(Body::from_stream(stream))
        }
        Framing::Raw => {
            let chunks = spawn_raw_pump(upstream, max_duration);
            raw_response(Body::from_stream(ReceiverStream::new(chunks)))
        }
    };

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::{DebugRequest, GenerateRequest};

    #[test]
    fn test_parse_body_empty_is_default() {
        let req: GenerateRequest = parse_body(b"  ").unwrap();
        assert!(req.prompt.is_empty());
    }

    #[test]
    fn test_parse_body_rejects_garbage() {
        let err = parse_body::<DebugRequest>(b"{oops").unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_framing_query_default() {
        let q: RelayQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(q.framing, Framing::Event);
        let q: RelayQuery = serde_json::from_str(r#"{"framing":"raw"}"#).unwrap();
        assert_eq!(q.framing, Framing::Raw);
    }
}
