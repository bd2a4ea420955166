//! POST /sessions/{id}/end — "End chat".

use std::sync::Arc;

use axum::extract::{Path, Query, State, rejection::QueryRejection};
use chat_history::EndChatOutcome;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    core::{app_state::AppState, http::response_envelope::ApiResponse},
    error_handler::AppResult,
};

#[derive(Debug, Deserialize)]
pub struct EndChatQuery {
    /// Write the turns to the history store before clearing.
    #[serde(default = "default_persist")]
    pub persist: bool,
}

fn default_persist() -> bool {
    true
}

/// Handler: POST /sessions/{id}/end?persist=true|false
///
/// The session stays registered but empty afterwards.
pub async fn end_chat(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    query: Result<Query<EndChatQuery>, QueryRejection>,
) -> AppResult<ApiResponse<EndChatOutcome>> {
    let Query(query) = query?;
    let store = query.persist.then_some(&state.history);
    let outcome = state.sessions.end_chat(id, store).await?;
    Ok(ApiResponse::success(outcome))
}
