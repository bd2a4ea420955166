use std::path::PathBuf;

use storage::StorageError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history io error: {0}")]
    Io(#[from] std::io::Error),

    /// The history file exists but is not a JSON list of turns.
    #[error("malformed history file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The turns are in the local file; only the remote copy is stale.
    #[error("history saved locally ({committed} turns) but upload failed: {source}")]
    RemoteMirror {
        committed: usize,
        #[source]
        source: StorageError,
    },

    #[error("history writer task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("unknown session {0}")]
    UnknownSession(Uuid),
}
