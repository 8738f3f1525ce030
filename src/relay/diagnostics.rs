//! Model availability checks

use super::error::RelayError;
use super::AppState;
use crate::api::{ModelProbe, StreamingProvider};
use axum::extract::State;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelReport {
    pub success: bool,
    pub available_models: Vec<String>,
    pub unavailable_models: Vec<ModelProbe>,
    pub total_tested: usize,
    pub recommendation: String,
}

/// Probe each candidate model in order, one request per model.
pub async fn check_models(provider: &dyn StreamingProvider, candidates: &[String]) -> ModelReport {
    let mut available_models = Vec::new();
    let mut unavailable_models = Vec::new();

    for model in candidates {
        match provider.probe(model).await {
            Ok(()) => {
                info!("Model {} is available", model);
                available_models.push(model.clone());
            }
            Err(e) => {
                warn!("Model {} is unavailable: {}", model, e);
                unavailable_models.push(ModelProbe::unavailable(model.as_str(), e.to_string()));
            }
        }
    }

    let recommendation = match available_models.first() {
        Some(model) => format!("Use {}", model),
        None => "No candidate model responded; check the API key and its quota".to_string(),
    };

    ModelReport {
        success: !available_models.is_empty(),
        total_tested: candidates.len(),
        available_models,
        unavailable_models,
        recommendation,
    }
}

pub async fn check_models_handler(
    State(state): State<AppState>,
) -> Result<Json<ModelReport>, RelayError> {
    if !state.provider.is_configured() {
        return Err(RelayError::NotConfigured);
    }
    let report = check_models(state.provider.as_ref(), &state.settings.candidate_models).await;
    Ok(Json(report))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderStatus {
    pub success: bool,
    pub model: String,
    pub message: String,
}

/// Connectivity probe against the configured model
pub async fn test_provider_handler(
    State(state): State<AppState>,
) -> Result<Json<ProviderStatus>, RelayError> {
    if !state.provider.is_configured() {
        return Err(RelayError::NotConfigured);
    }
    let model = state.provider.model().to_string();
    let status = match state.provider.probe(&model).await {
        Ok(()) => ProviderStatus {
            success: true,
            message: format!("{} responded", model),
            model,
        },
        Err(e) => ProviderStatus {
            success: false,
            message: e.to_string(),
            model,
        },
    };
    Ok(Json(status))
}

pub async fn healthz_handler() -> &'static str {
    "OK"
}
