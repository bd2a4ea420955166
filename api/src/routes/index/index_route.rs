//! POST /index — "Vectors Update": ingest, embed, persist, publish.

use std::sync::Arc;

use axum::extract::State;
use rag_store::{build_index, publish_index};
use tracing::{info, instrument, warn};

use crate::{
    core::{app_state::AppState, http::response_envelope::ApiResponse},
    error_handler::{AppError, AppResult},
    routes::index::index_response::IndexResponse,
};

/// Handler: POST /index
///
/// Rebuilds the index from everything under the data directory. Once the new
/// index is persisted it replaces the cached one, then it is published when
/// an object store is configured. A failed publish is reported, but the
/// local index stays in use.
#[instrument(name = "index_route", skip_all)]
pub async fn rebuild_index(
    State(state): State<Arc<AppState>>,
) -> AppResult<ApiResponse<IndexResponse>> {
    let _pipeline = state.pipeline.lock().await;
    let cfg = &state.config;
    // A missing data directory means nothing to index.
    tokio::fs::create_dir_all(&cfg.data_dir)
        .await
        .map_err(AppError::Server)?;

    let index = build_index(
        &cfg.data_dir,
        &cfg.index_dir,
        state.extractor.as_ref(),
        state.embedder.as_ref(),
        &cfg.rag,
    )
    .await?;
    // The files on disk are already replaced; the cache must follow them.
    let index = state.replace_index(index).await;

    let uploaded = match &state.object_store {
        Some(store) => publish_index(store.as_ref(), &cfg.index_dir, &cfg.index_key_prefix)
            .await
            .inspect_err(|e| warn!(error = %e, "index rebuilt locally but publish failed"))?,
        None => Vec::new(),
    };

    info!(chunks = index.len(), uploaded = uploaded.len(), "vectors updated");
    Ok(ApiResponse::success(IndexResponse::new(&index, uploaded)))
}
