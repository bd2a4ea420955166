//! POST /sessions/{id}/ask — "Get answer".

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use contextor::{AskOptions, QaAnswer};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    core::{app_state::AppState, http::response_envelope::ApiResponse},
    error_handler::AppResult,
    routes::ask::ask_request::{AskRequest, AskResponse},
};

/// Handler: POST /sessions/{id}/ask
///
/// Retrieves the closest chunks, asks the chat model and appends the
/// (question, answer) turn to the session.
///
/// # Example
/// ```bash
/// curl -X POST http://127.0.0.1:8501/sessions/$ID/ask \
///   -H 'content-type: application/json' \
///   -d '{"question":"What is the main contribution?"}'
/// ```
#[instrument(name = "ask_route", skip_all, fields(session = %id))]
pub async fn ask_question(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    body: Result<Json<AskRequest>, JsonRejection>,
) -> AppResult<ApiResponse<AskResponse>> {
    let Json(body) = body?;
    // Fail fast on an unknown session before spending model calls.
    state.sessions.get(id).await?;

    let opts = AskOptions {
        top_k: state.config.rag.top_k,
        max_tokens: state.config.llm_max_tokens,
    };

    let QaAnswer { answer, context } = {
        let _pipeline = state.pipeline.lock().await;
        let index = state.current_index().await?;
        contextor::ask(
            &index,
            &body.question,
            state.embedder.as_ref(),
            state.chat.as_ref(),
            &opts,
        )
        .await?
    };

    let turns = state
        .sessions
        .append(id, body.question.trim(), answer.clone())
        .await?;
    info!(turns, context = context.len(), "question answered");

    Ok(ApiResponse::success(AskResponse {
        answer,
        context,
        turns,
    }))
}
