//! Unified error types for the crate.

use std::path::PathBuf;

use ai_llm_service::AiLlmError;
use storage::StorageError;
use thiserror::Error;

/// Top-level error for rag-store operations.
#[derive(Debug, Error)]
pub enum RagError {
    /// I/O or filesystem errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing / serialization errors.
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Invalid or unsupported configuration.
    #[error("config error: {0}")]
    Config(String),

    /// Text extraction failed for one file.
    #[error("failed to extract text from {path}: {reason}")]
    Extract { path: PathBuf, reason: String },

    /// Mismatch in vector dimensionality across records.
    #[error("vector size mismatch: got {got}, want {want}")]
    VectorSizeMismatch { got: usize, want: usize },

    /// The document set produced no chunks.
    #[error("nothing to index: no text chunks were produced")]
    NothingToIndex,

    /// No persisted index at the given directory.
    #[error("no vector index found at {0}")]
    IndexMissing(PathBuf),

    /// Persisted index is structurally inconsistent.
    #[error("corrupt index: {0}")]
    CorruptIndex(String),

    /// The embedding service failed for one chunk.
    #[error("embedding failed for chunk {chunk}: {source}")]
    Embedding {
        chunk: String,
        #[source]
        source: AiLlmError,
    },

    /// Artifact upload/download failure.
    #[error(transparent)]
    Storage(#[from] StorageError),
}
