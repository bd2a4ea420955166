use std::{
    io::Write,
    path::{Path, PathBuf},
};

use tracing::trace;

use crate::{BoxFuture, ObjectStore, StorageError, validate_key};

/// A directory used as a bucket: objects live at `{root}/{bucket}/{key}`.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    bucket_dir: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl AsRef<Path>, bucket: &str) -> Result<Self, StorageError> {
        if bucket.trim().is_empty() || bucket.contains('/') {
            return Err(StorageError::Config(format!("invalid bucket name {bucket:?}")));
        }
        Ok(Self {
            bucket_dir: root.as_ref().join(bucket),
        })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(self.bucket_dir.join(key))
    }
}

impl ObjectStore for LocalObjectStore {
    fn describe(&self) -> String {
        format!("local:{}", self.bucket_dir.display())
    }

    fn put<'a>(&'a self, key: &'a str, body: Vec<u8>) -> BoxFuture<'a, Result<(), StorageError>> {
        Box::pin(async move {
            let path = self.path_for(key)?;
            let len = body.len();
            let target = path.clone();
            tokio::task::spawn_blocking(move || write_object(&target, &body))
                .await
                .map_err(std::io::Error::other)??;
            trace!(path = %path.display(), bytes = len, "object written");
            Ok(())
        })
    }

    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<Vec<u8>>, StorageError>> {
        Box::pin(async move {
            let path = self.path_for(key)?;
            match tokio::fs::read(&path).await {
                Ok(body) => Ok(Some(body)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }
}

/// Readers never observe a half-written object: the body goes to a uniquely
/// named temp file in the same directory, then replaces the target.
fn write_object(path: &Path, body: &[u8]) -> Result<(), StorageError> {
    let dir = path
        .parent()
        .ok_or_else(|| StorageError::InvalidKey(path.display().to_string()))?;
    std::fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(body)?;
    tmp.persist(path).map_err(|e| StorageError::Io(e.error))?;
    Ok(())
}
