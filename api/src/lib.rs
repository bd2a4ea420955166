pub mod core;
pub mod error_handler;
mod middleware_layer;
mod routes;

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
};
use tokio::signal;
use tracing::{info, warn};

use crate::{
    core::app_state::AppState,
    error_handler::AppError,
    middleware_layer::json_extractor::json_error_mapper,
    routes::{
        ask::ask_route::ask_question,
        end_chat::end_chat_route::end_chat,
        health::health_route::health,
        index::index_route::rebuild_index,
        sessions::session_route::{create_session, get_session},
        ui::ui_route::index_page,
        upload::upload_route::upload_pdf,
    },
};

/// All HTTP routes over the given state.
pub fn router(state: Arc<AppState>) -> Router {
    let upload_limit = DefaultBodyLimit::max(state.config.max_upload_bytes);

    Router::new()
        .route("/", get(index_page))
        .route("/health", get(health))
        .route("/upload", post(upload_pdf).layer(upload_limit))
        .route("/index", post(rebuild_index))
        .route("/sessions", post(create_session))
        .route("/sessions/{id}", get(get_session))
        .route("/sessions/{id}/ask", post(ask_question))
        .route("/sessions/{id}/end", post(end_chat))
        .layer(middleware::from_fn(json_error_mapper))
        .with_state(state)
}

pub async fn start() -> Result<(), AppError> {
    let state = Arc::new(AppState::from_env()?);
    let address = state.config.api_address.clone();

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .map_err(AppError::Bind)?;
    info!(%address, "learn-smart api listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(AppError::Server)?;

    info!("server stopped");
    Ok(())
}

/// Resolves on Ctrl+C. If the handler cannot be installed the server runs
/// until killed.
async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
