//! Object-store capability used to publish index artifacts and chat history.
//!
//! Two backends:
//! - [`LocalObjectStore`]: a directory acting as a bucket (`{root}/{bucket}/{key}`)
//! - [`HttpObjectStore`]: plain `PUT`/`GET` against `{endpoint}/{bucket}/{key}`
//!   (MinIO/S3-compatible gateways with anonymous or bearer-token access)

mod errors;
mod http;
mod local;

use std::path::Path;

use tracing::{debug, error, info};

pub use errors::StorageError;
pub use http::HttpObjectStore;
pub use local::LocalObjectStore;

pub use futures::future::BoxFuture;

/// Minimal bucket interface: whole-object writes and reads.
pub trait ObjectStore: Send + Sync {
    /// Human-readable location (for logs).
    fn describe(&self) -> String;

    /// Creates or overwrites the object at `key`.
    fn put<'a>(&'a self, key: &'a str, body: Vec<u8>) -> BoxFuture<'a, Result<(), StorageError>>;

    /// Reads the object at `key`; `Ok(None)` when it does not exist.
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<Vec<u8>>, StorageError>>;
}

/// Joins a key prefix and a name with exactly one `/`.
pub fn join_key(prefix: &str, name: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}/{name}")
    }
}

/// Rejects keys that are empty, absolute, or contain `.`/`..` segments.
pub(crate) fn validate_key(key: &str) -> Result<(), StorageError> {
    if key.is_empty()
        || key.starts_with('/')
        || key
            .split('/')
            .any(|seg| seg.is_empty() || seg == "." || seg == "..")
    {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// Uploads every regular file directly under `dir` to `{prefix}/{file_name}`,
/// in file-name order.
///
/// Returns the uploaded keys. On failure, objects already written stay in
/// the bucket.
pub async fn upload_dir(
    store: &dyn ObjectStore,
    dir: &Path,
    prefix: &str,
) -> Result<Vec<String>, StorageError> {
    let mut names = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();

    let mut uploaded = Vec::with_capacity(names.len());
    for name in names {
        let key = join_key(prefix, &name);
        let body = tokio::fs::read(dir.join(&name)).await?;
        debug!(%key, bytes = body.len(), "uploading artifact");
        if let Err(e) = store.put(&key, body).await {
            error!(
                %key,
                uploaded = uploaded.len(),
                store = %store.describe(),
                error = %e,
                "artifact upload failed; earlier objects are left in place"
            );
            return Err(e);
        }
        uploaded.push(key);
    }

    info!(count = uploaded.len(), store = %store.describe(), "artifacts uploaded");
    Ok(uploaded)
}

/// Downloads `{prefix}/{name}` for each of `names` into `dir`.
///
/// Returns `Ok(false)` (writing nothing) if any object is missing.
pub async fn download_into(
    store: &dyn ObjectStore,
    prefix: &str,
    names: &[&str],
    dir: &Path,
) -> Result<bool, StorageError> {
    let mut bodies = Vec::with_capacity(names.len());
    for name in names {
        match store.get(&join_key(prefix, name)).await? {
            Some(body) => bodies.push((*name, body)),
            None => return Ok(false),
        }
    }
    tokio::fs::create_dir_all(dir).await?;
    for (name, body) in bodies {
        tokio::fs::write(dir.join(name), body).await?;
    }
    Ok(true)
}
