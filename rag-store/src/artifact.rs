//! Publishing a persisted index to (and restoring it from) an object store.

use std::path::Path;

use storage::ObjectStore;
use tracing::info;

use crate::{errors::RagError, index::ARTIFACT_FILES};

/// Uploads each file of the index directory to `{prefix}/{file_name}`.
///
/// Objects uploaded before a failure stay in the bucket.
pub async fn publish_index(
    store: &dyn ObjectStore,
    dir: &Path,
    prefix: &str,
) -> Result<Vec<String>, RagError> {
    let keys = storage::upload_dir(store, dir, prefix).await?;
    info!(prefix, count = keys.len(), "index artifacts published");
    Ok(keys)
}

/// Downloads a previously published index into `dir`.
///
/// Returns `false` when the bucket has no complete index under `prefix`.
pub async fn restore_index(
    store: &dyn ObjectStore,
    prefix: &str,
    dir: &Path,
) -> Result<bool, RagError> {
    let restored = storage::download_into(store, prefix, &ARTIFACT_FILES, dir).await?;
    if restored {
        info!(prefix, dir = %dir.display(), "index artifacts restored");
    }
    Ok(restored)
}
