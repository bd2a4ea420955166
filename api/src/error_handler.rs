use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chat_history::HistoryError;
use contextor::ContextorError;
use rag_store::RagError;
use storage::StorageError;
use thiserror::Error;
use tracing::{error, warn};

use crate::core::{config::ConfigError, http::response_envelope::ApiResponse};

/// Public application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // --- Boot / config ---
    #[error(transparent)]
    Config(#[from] ConfigError),

    // --- IO / network / server ---
    #[error("failed to bind listener")]
    Bind(#[source] std::io::Error),

    #[error("server error")]
    Server(#[source] std::io::Error),

    // --- Request / routing ---
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Rich HTTP error mapped from lower layers with specific status & code.
    #[error("{message}")]
    Http {
        status: StatusCode,
        code: &'static str,
        message: String,
    },
}

impl AppError {
    fn http(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        AppError::Http {
            status,
            code,
            message: message.into(),
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Http { status, .. } => *status,
            AppError::Config(_) | AppError::Bind(_) | AppError::Server(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Bind(_) => "BIND_ERROR",
            AppError::Server(_) => "SERVER_ERROR",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Http { code, .. } => code,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(code = self.error_code(), error = %self, "request failed");
        } else {
            warn!(code = self.error_code(), error = %self, "request rejected");
        }
        ApiResponse::<()>::error(self.error_code(), self.to_string(), Vec::new())
            .with_status(status)
            .into_response()
    }
}

/// Handy result alias used across handlers.
pub type AppResult<T> = Result<T, AppError>;

impl From<axum::extract::rejection::JsonRejection> for AppError {
    fn from(err: axum::extract::rejection::JsonRejection) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<axum::extract::rejection::QueryRejection> for AppError {
    fn from(err: axum::extract::rejection::QueryRejection) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::http(err.status(), "UPLOAD_ERROR", err.body_text())
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        AppError::http(StatusCode::BAD_GATEWAY, "OBJECT_STORE_ERROR", err.to_string())
    }
}

impl From<RagError> for AppError {
    fn from(err: RagError) -> Self {
        let msg = err.to_string();
        match err {
            RagError::IndexMissing(_) => AppError::http(
                StatusCode::CONFLICT,
                "INDEX_MISSING",
                "No vector index yet: upload a PDF and run \"Vectors Update\" first.",
            ),
            RagError::NothingToIndex => AppError::http(
                StatusCode::BAD_REQUEST,
                "NOTHING_TO_INDEX",
                "No text found to index: upload a PDF with extractable text.",
            ),
            RagError::Config(_) => AppError::http(StatusCode::BAD_REQUEST, "RAG_CONFIG", msg),
            RagError::Extract { .. } => {
                AppError::http(StatusCode::BAD_GATEWAY, "EXTRACT_FAILED", msg)
            }
            RagError::Embedding { .. } => {
                AppError::http(StatusCode::BAD_GATEWAY, "EMBEDDING_FAILED", msg)
            }
            RagError::Storage(e) => e.into(),
            RagError::CorruptIndex(_) | RagError::Parse(_) => {
                AppError::http(StatusCode::INTERNAL_SERVER_ERROR, "INDEX_CORRUPT", msg)
            }
            RagError::VectorSizeMismatch { .. } => AppError::http(
                StatusCode::INTERNAL_SERVER_ERROR,
                "VECTOR_SIZE_MISMATCH",
                msg,
            ),
            RagError::Io(_) => AppError::http(StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR", msg),
        }
    }
}

impl From<ContextorError> for AppError {
    fn from(err: ContextorError) -> Self {
        match err {
            ContextorError::Rag(e) => e.into(),
            ContextorError::Llm(e) => {
                AppError::http(StatusCode::BAD_GATEWAY, "LLM_ERROR", e.to_string())
            }
            ContextorError::EmptyQuestion => AppError::BadRequest("question is empty".into()),
        }
    }
}

impl From<HistoryError> for AppError {
    fn from(err: HistoryError) -> Self {
        let msg = err.to_string();
        match err {
            HistoryError::UnknownSession(id) => AppError::NotFound(format!("session {id}")),
            HistoryError::RemoteMirror { .. } => {
                AppError::http(StatusCode::BAD_GATEWAY, "OBJECT_STORE_ERROR", msg)
            }
            HistoryError::Parse { .. } => {
                AppError::http(StatusCode::INTERNAL_SERVER_ERROR, "HISTORY_CORRUPT", msg)
            }
            HistoryError::Io(_) | HistoryError::Join(_) => {
                AppError::http(StatusCode::INTERNAL_SERVER_ERROR, "HISTORY_IO", msg)
            }
        }
    }
}
