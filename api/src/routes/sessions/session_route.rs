//! POST /sessions and GET /sessions/{id}.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    core::{app_state::AppState, http::response_envelope::ApiResponse},
    error_handler::AppResult,
    routes::sessions::session_response::SessionView,
};

/// Handler: POST /sessions
///
/// # Example
/// ```bash
/// curl -X POST http://127.0.0.1:8501/sessions
/// ```
pub async fn create_session(State(state): State<Arc<AppState>>) -> ApiResponse<SessionView> {
    let session = state.sessions.create().await;
    ApiResponse::success(SessionView::from(session)).with_status(StatusCode::CREATED)
}

/// Handler: GET /sessions/{id}
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> AppResult<ApiResponse<SessionView>> {
    let session = state.sessions.get(id).await?;
    Ok(ApiResponse::success(session.into()))
}
