//! Durable chat history: a local JSON file plus an optional remote copy.
//!
//! The local file accumulates every flushed turn. The remote object is
//! overwritten on each flush with the turns of that flush only.

use std::{
    io::Write,
    path::{Path, PathBuf},
    sync::Arc,
};

use storage::ObjectStore;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{errors::HistoryError, session::ChatTurn};

/// Remote destination for flushed turns.
#[derive(Clone)]
pub struct RemoteHistory {
    pub store: Arc<dyn ObjectStore>,
    pub key: String,
}

pub struct HistoryStore {
    path: PathBuf,
    remote: Option<RemoteHistory>,
    // Serializes read-modify-write of `path` within the process.
    write_lock: Mutex<()>,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>, remote: Option<RemoteHistory>) -> Self {
        Self {
            path: path.into(),
            remote,
            write_lock: Mutex::new(()),
        }
    }

    /// All persisted turns. A missing file is an empty history.
    pub async fn load(&self) -> Result<Vec<ChatTurn>, HistoryError> {
        read_turns(&self.path).await
    }

    /// Appends `turns` to the history file and uploads them as the remote
    /// object. Returns the number of turns now in the file.
    ///
    /// # Errors
    /// A malformed existing file is reported and left untouched. A failed
    /// upload after the local write is [`HistoryError::RemoteMirror`].
    pub async fn flush(&self, turns: &[ChatTurn]) -> Result<usize, HistoryError> {
        let _guard = self.write_lock.lock().await;

        let mut all = read_turns(&self.path).await?;
        let before = all.len();
        all.extend_from_slice(turns);

        let body = serde_json::to_vec_pretty(&all).map_err(|source| HistoryError::Parse {
            path: self.path.clone(),
            source,
        })?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomic(&path, &body)).await??;
        debug!(path = %self.path.display(), before, after = all.len(), "history file updated");

        if let Some(remote) = &self.remote {
            let body = serde_json::to_vec_pretty(turns).map_err(|source| HistoryError::Parse {
                path: self.path.clone(),
                source,
            })?;
            if let Err(source) = remote.store.put(&remote.key, body).await {
                warn!(key = %remote.key, error = %source, "history saved locally but upload failed");
                return Err(HistoryError::RemoteMirror {
                    committed: turns.len(),
                    source,
                });
            }
        }

        info!(flushed = turns.len(), total = all.len(), "chat history flushed");
        Ok(all.len())
    }
}

async fn read_turns(path: &Path) -> Result<Vec<ChatTurn>, HistoryError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    serde_json::from_slice(&bytes).map_err(|source| HistoryError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn write_atomic(path: &Path, body: &[u8]) -> Result<(), HistoryError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(body)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| HistoryError::Io(e.error))?;
    Ok(())
}
