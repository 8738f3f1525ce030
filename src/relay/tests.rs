use super::*;
use crate::api::{ProviderError, ProviderRequest, StreamChunk, TokenUsage};
use crate::client::{consume, consume_raw, Outcome};
use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, Response};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc;
use tower::ServiceExt;

/// Scripted provider that records how often it was called
#[derive(Default)]
struct MockProvider {
    configured: bool,
    chunks: Vec<StreamChunk>,
    fail_before_stream: Option<String>,
    unavailable: Vec<String>,
    calls: AtomicUsize,
    last_request: Mutex<Option<ProviderRequest>>,
}

impl MockProvider {
    fn configured(chunks: Vec<StreamChunk>) -> Self {
        Self {
            configured: true,
            chunks,
            ..Default::default()
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StreamingProvider for MockProvider {
    fn is_configured(&self) -> bool {
        self.configured
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn send_streaming(
        &self,
        request: ProviderRequest,
    ) -> Result<mpsc::Receiver<StreamChunk>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_request.lock() {
            *last = Some(request);
        }
        if let Some(message) = &self.fail_before_stream {
            return Err(ProviderError::Status {
                status: 503,
                message: message.clone(),
            });
        }

        let (tx, rx) = mpsc::channel(self.chunks.len().max(1));
        for chunk in &self.chunks {
            tx.try_send(chunk.clone()).unwrap();
        }
        Ok(rx)
    }

    async fn probe(&self, model: &str) -> Result<(), ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.iter().any(|m| m == model) {
            return Err(ProviderError::Status {
                status: 404,
                message: format!("{} not found", model),
            });
        }
        Ok(())
    }
}

fn app(provider: Arc<MockProvider>) -> Router {
    router(AppState::new(provider, RelaySettings::default()))
}

fn post_json(path: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_string(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn error_message(response: Response<Body>) -> String {
    let envelope: ErrorEnvelope = serde_json::from_str(&body_string(response).await).unwrap();
    envelope.error
}

fn valid_body(kind: FeatureKind) -> Value {
    match kind {
        FeatureKind::Generate => json!({"prompt": "an ERC20 token", "contractType": "token"}),
        FeatureKind::Explain => json!({"code": "fn main() {}"}),
        FeatureKind::Debug => json!({"errorMessage": "error[E0425]: cannot find value"}),
        FeatureKind::Tutor => json!({"question": "What is a storage item?"}),
        FeatureKind::Analytics => json!({"question": "How are we doing?"}),
        FeatureKind::Search => json!({"searchQuery": "nft"}),
        FeatureKind::Tests => json!({"contractCode": "#[ink::contract] mod a {}"}),
        FeatureKind::Chat => json!({"message": "hello"}),
        FeatureKind::Docs => json!({"searchQuery": "weights"}),
        FeatureKind::Deploy => {
            json!({"contractCode": "contract A {}", "question": "How do I deploy to Paseo?"})
        }
        FeatureKind::ExplainTemplate => {
            json!({"templateCode": "contract A {}", "templateName": "Vault"})
        }
    }
}

fn fragments(parts: &[&str]) -> Vec<StreamChunk> {
    let mut chunks: Vec<StreamChunk> = parts
        .iter()
        .map(|p| StreamChunk::TextDelta(p.to_string()))
        .collect();
    chunks.push(StreamChunk::Done(TokenUsage::new(10, parts.len() as u32)));
    chunks
}

#[tokio::test]
async fn test_missing_primary_field_rejected_before_provider() {
    let provider = Arc::new(MockProvider::configured(fragments(&["x"])));

    for kind in FeatureKind::ALL {
        let response = app(provider.clone())
            .oneshot(post_json(kind.route(), &json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", kind);
        assert_eq!(
            error_message(response).await,
            format!("Missing {} field", kind.primary_field())
        );
    }
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn test_blank_field_rejected() {
    let provider = Arc::new(MockProvider::configured(fragments(&["x"])));
    let response = app(provider.clone())
        .oneshot(post_json("/api/debug", &json!({"errorMessage": "   "})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(response).await, "Missing errorMessage field");
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn test_unconfigured_provider_rejected_after_validation() {
    let provider = Arc::new(MockProvider::default());

    for kind in FeatureKind::ALL {
        let response = app(provider.clone())
            .oneshot(post_json(kind.route(), &valid_body(kind)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR, "{}", kind);
        assert_eq!(error_message(response).await, "GEMINI_API_KEY is not configured");
    }
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let provider = Arc::new(MockProvider::configured(fragments(&["x"])));
    let request = Request::builder()
        .method("POST")
        .uri("/api/explain")
        .body(Body::from("{\"code\":"))
        .unwrap();
    let response = app(provider.clone()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(error_message(response).await.starts_with("Invalid request body"));
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn test_fragments_relayed_in_order() {
    let provider = Arc::new(MockProvider::configured(fragments(&["Hel", "lo ", "world"])));
    let response = app(provider.clone())
        .oneshot(post_json("/api/explain", &valid_body(FeatureKind::Explain)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/event-stream"
    );
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");

    let mut seen = Vec::new();
    let outcome = consume(response.into_body().into_data_stream(), |f| {
        seen.push(f.to_string())
    })
    .await;
    assert_eq!(outcome, Outcome::Answer("Hello world".into()));
    assert_eq!(seen, vec!["Hel", "lo ", "world"]);
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn test_done_written_exactly_once() {
    let provider = Arc::new(MockProvider::configured(fragments(&["a", "b"])));
    let response = app(provider)
        .oneshot(post_json("/api/chat", &valid_body(FeatureKind::Chat)))
        .await
        .unwrap();
    let body = body_string(response).await;
    assert_eq!(body.matches("data: [DONE]").count(), 1);
    assert!(body.ends_with("data: [DONE]\n\n"));
}

#[tokio::test]
async fn test_empty_stream_reports_no_content() {
    let provider = Arc::new(MockProvider::configured(fragments(&[])));
    let response = app(provider)
        .oneshot(post_json("/api/tutor", &valid_body(FeatureKind::Tutor)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_string(response).await,
        format!(
            "data: {{\"error\":\"{}\"}}\n\ndata: [DONE]\n\n",
            NO_CONTENT_MESSAGE
        )
    );
}

#[tokio::test]
async fn test_mid_stream_error_after_fragments() {
    let provider = Arc::new(MockProvider::configured(vec![
        StreamChunk::TextDelta("f1".into()),
        StreamChunk::TextDelta("f2".into()),
        StreamChunk::Error("quota exceeded".into()),
    ]));
    let response = app(provider)
        .oneshot(post_json("/api/debug", &valid_body(FeatureKind::Debug)))
        .await
        .unwrap();

    let outcome = consume(response.into_body().into_data_stream(), |_| {}).await;
    assert_eq!(
        outcome,
        Outcome::Error {
            message: "quota exceeded".into(),
            partial: "f1f2".into()
        }
    );
}

#[tokio::test]
async fn test_mid_stream_error_wire_format() {
    let provider = Arc::new(MockProvider::configured(vec![
        StreamChunk::TextDelta("f1".into()),
        StreamChunk::TextDelta("f2".into()),
        StreamChunk::Error("boom".into()),
    ]));
    let response = app(provider)
        .oneshot(post_json("/api/debug", &valid_body(FeatureKind::Debug)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_string(response).await;
    assert_eq!(
        body,
        "data: {\"content\":\"f1\"}\n\ndata: {\"content\":\"f2\"}\n\n\
         data: {\"error\":\"boom\"}\n\ndata: [DONE]\n\n"
    );
    assert_eq!(body.matches("[DONE]").count(), 1);
}

#[tokio::test]
async fn test_unknown_framing_is_json_bad_request() {
    let provider = Arc::new(MockProvider::configured(fragments(&["x"])));
    let response = app(provider.clone())
        .oneshot(post_json(
            "/api/explain?framing=bogus",
            &valid_body(FeatureKind::Explain),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/json"
    );
    assert!(error_message(response).await.starts_with("Invalid query"));
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn test_pre_stream_failure_event_framed() {
    let provider = Arc::new(MockProvider {
        configured: true,
        fail_before_stream: Some("service unavailable".into()),
        ..Default::default()
    });
    let response = app(provider.clone())
        .oneshot(post_json("/api/docs-search", &valid_body(FeatureKind::Docs)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let outcome = consume(response.into_body().into_data_stream(), |_| {}).await;
    match outcome {
        Outcome::Error { message, partial } => {
            assert!(message.contains("service unavailable"));
            assert!(partial.is_empty());
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn test_raw_framing_writes_fragments_verbatim() {
    let provider = Arc::new(MockProvider::configured(fragments(&["data: ", "{not framed}"])));
    let response = app(provider)
        .oneshot(post_json(
            "/api/generate?framing=raw",
            &valid_body(FeatureKind::Generate),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/plain; charset=utf-8"
    );

    let outcome = consume_raw(response.into_body().into_data_stream(), |_| {}).await;
    assert_eq!(outcome, Outcome::Answer("data: {not framed}".into()));
}

#[tokio::test]
async fn test_raw_framing_pre_stream_failure_is_bad_gateway() {
    let provider = Arc::new(MockProvider {
        configured: true,
        fail_before_stream: Some("upstream down".into()),
        ..Default::default()
    });
    let response = app(provider)
        .oneshot(post_json(
            "/api/generate-tests?framing=raw",
            &valid_body(FeatureKind::Tests),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert!(error_message(response).await.contains("upstream down"));
}

#[tokio::test]
async fn test_raw_framing_mid_stream_error_aborts_body() {
    let provider = Arc::new(MockProvider::configured(vec![
        StreamChunk::TextDelta("half".into()),
        StreamChunk::Error("reset".into()),
    ]));
    let response = app(provider)
        .oneshot(post_json(
            "/api/marketplace-search?framing=raw",
            &valid_body(FeatureKind::Search),
        ))
        .await
        .unwrap();
    let outcome = consume_raw(response.into_body().into_data_stream(), |_| {}).await;
    assert_eq!(outcome, Outcome::Interrupted { partial: "half".into() });
}

#[tokio::test]
async fn test_prompt_reaches_provider() {
    let provider = Arc::new(MockProvider::configured(fragments(&["ok"])));
    let body = json!({
        "errorMessage": "error[E0425]: cannot find value `x`",
        "code": "#[ink(message)] pub fn get(&self) {}"
    });
    let response = app(provider.clone())
        .oneshot(post_json("/api/debug", &body))
        .await
        .unwrap();
    body_string(response).await;

    let request = provider.last_request.lock().unwrap().clone().unwrap();
    assert!(request.prompt.contains("cannot find value"));
    assert!(request.prompt.contains("#[ink(message)]"));
    assert!(request.system.is_some());
}

#[tokio::test]
async fn test_check_models_report() {
    let provider = Arc::new(MockProvider {
        configured: true,
        unavailable: vec!["gemini-pro".into()],
        ..Default::default()
    });
    let settings = RelaySettings {
        candidate_models: vec!["gemini-pro".into(), "gemini-2.5-flash".into()],
        ..Default::default()
    };
    let app = router(AppState::new(provider.clone(), settings));

    let request = Request::builder()
        .uri("/api/check-models")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let report: ModelReport = serde_json::from_str(&body_string(response).await).unwrap();
    assert!(report.success);
    assert_eq!(report.total_tested, 2);
    assert_eq!(report.available_models, vec!["gemini-2.5-flash"]);
    assert_eq!(report.unavailable_models.len(), 1);
    assert_eq!(report.unavailable_models[0].model, "gemini-pro");
    assert_eq!(report.recommendation, "Use gemini-2.5-flash");
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn test_check_models_unconfigured() {
    let provider = Arc::new(MockProvider::default());
    let request = Request::builder()
        .method("POST")
        .uri("/api/check-models")
        .body(Body::empty())
        .unwrap();
    let response = app(provider.clone()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn test_provider_status() {
    let provider = Arc::new(MockProvider {
        configured: true,
        unavailable: vec!["mock-model".into()],
        ..Default::default()
    });
    let request = Request::builder()
        .uri("/api/test-provider")
        .body(Body::empty())
        .unwrap();
    let response = app(provider).oneshot(request).await.unwrap();
    let status: ProviderStatus = serde_json::from_str(&body_string(response).await).unwrap();
    assert!(!status.success);
    assert_eq!(status.model, "mock-model");
    assert!(status.message.contains("not found"));
}

#[tokio::test]
async fn test_healthz() {
    let request = Request::builder().uri("/healthz").body(Body::empty()).unwrap();
    let response = app(Arc::new(MockProvider::default()))
        .oneshot(request)
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "OK");
}

#[tokio::test]
async fn test_cors_preflight() {
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/api/generate")
        .header(header::ORIGIN, "http://localhost:5173")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();
    let response = app(Arc::new(MockProvider::default()))
        .oneshot(request)
        .await
        .unwrap();
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
}
