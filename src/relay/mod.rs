//! HTTP relay between browsers and the generative-AI provider
//!
//! Each feature endpoint accepts a JSON body, validates it, checks that a
//! credential is configured and then streams the provider's output back as
//! event frames (or raw chunks with `?framing=raw`). Every request owns its
//! provider call and pump task; the only shared state is the read-only
//! [`AppState`].

mod diagnostics;
mod error;
pub mod frame;
mod handlers;
mod pump;

pub use diagnostics::{check_models, ModelReport, ProviderStatus};
pub use error::{ErrorEnvelope, RelayError};
pub use frame::Frame;
pub use handlers::Framing;
pub use pump::{DEADLINE_MESSAGE, NO_CONTENT_MESSAGE};

use crate::api::StreamingProvider;
use crate::prompt::{
    AnalyticsRequest, ChatRequest, DebugRequest, DeployRequest, DocsRequest, ExplainRequest,
    ExplainTemplateRequest, FeatureKind, GenerateRequest, SearchRequest, TestsRequest,
    TutorRequest,
};
use axum::error_handling::HandleErrorLayer;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;
use handlers::relay_feature;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower::{BoxError, ServiceBuilder};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Settings fixed at startup
#[derive(Debug, Clone)]
pub struct RelaySettings {
    /// Ceiling on the lifetime of one relayed stream
    pub max_duration: Duration,
    /// Models probed by the diagnostics endpoint
    pub candidate_models: Vec<String>,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            max_duration: Duration::from_secs(60),
            candidate_models: vec![crate::api::DEFAULT_MODEL.to_string()],
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn StreamingProvider>,
    pub settings: Arc<RelaySettings>,
}

impl AppState {
    pub fn new(provider: Arc<dyn StreamingProvider>, settings: RelaySettings) -> Self {
        Self {
            provider,
            settings: Arc::new(settings),
        }
    }
}

async fn handle_service_error(err: BoxError) -> impl IntoResponse {
    if err.is::<tower::timeout::error::Elapsed>() {
        (
            StatusCode::REQUEST_TIMEOUT,
            Json(ErrorEnvelope {
                error: "Request timed out".to_string(),
            }),
        )
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorEnvelope {
                error: format!("Unhandled internal error: {}", err),
            }),
        )
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    let max_duration = state.settings.max_duration;

    Router::new()
        .route(FeatureKind::Generate.route(), post(relay_feature::<GenerateRequest>))
        .route(FeatureKind::Explain.route(), post(relay_feature::<ExplainRequest>))
        .route(FeatureKind::Debug.route(), post(relay_feature::<DebugRequest>))
        .route(FeatureKind::Tutor.route(), post(relay_feature::<TutorRequest>))
        .route(FeatureKind::Analytics.route(), post(relay_feature::<AnalyticsRequest>))
        .route(FeatureKind::Search.route(), post(relay_feature::<SearchRequest>))
        .route(FeatureKind::Tests.route(), post(relay_feature::<TestsRequest>))
        .route(FeatureKind::Chat.route(), post(relay_feature::<ChatRequest>))
        .route(FeatureKind::Docs.route(), post(relay_feature::<DocsRequest>))
        .route(FeatureKind::Deploy.route(), post(relay_feature::<DeployRequest>))
        .route(
            FeatureKind::ExplainTemplate.route(),
            post(relay_feature::<ExplainTemplateRequest>),
        )
        .route(
            "/api/check-models",
            get(diagnostics::check_models_handler).post(diagnostics::check_models_handler),
        )
        .route("/api/test-provider", get(diagnostics::test_provider_handler))
        .route("/healthz", get(diagnostics::healthz_handler))
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_service_error))
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                )
                .timeout(max_duration),
        )
        .with_state(state)
}

/// Bind and serve until Ctrl-C
pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Relay listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = signal::ctrl_c().await {
                error!("Failed to install Ctrl-C handler: {}", e);
            }
            info!("Shutting down gracefully");
        })
        .await
}

#[cfg(test)]
mod tests;
