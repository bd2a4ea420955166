//! GET /health — probes the configured chat and embedding providers.

use std::sync::Arc;

use ai_llm_service::HealthStatus;
use axum::{extract::State, http::StatusCode};

use crate::core::{app_state::AppState, http::response_envelope::ApiResponse};

/// Handler: GET /health
///
/// 200 when every probe succeeds, 503 otherwise. Without real providers
/// (injected capabilities) the list is empty.
pub async fn health(State(state): State<Arc<AppState>>) -> ApiResponse<Vec<HealthStatus>> {
    let statuses: Vec<HealthStatus> = match &state.profiles {
        Some(profiles) => profiles.health_all().await,
        None => Vec::new(),
    };
    let status = if statuses.iter().all(|s| s.ok) {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    ApiResponse::success(statuses).with_status(status)
}
