//! POST /upload — stores the PDF the index will be built from.

use std::{io::Write, path::Path, sync::Arc};

use axum::extract::{Multipart, State};
use serde::Serialize;
use tracing::{info, instrument};

use crate::{
    core::{app_state::AppState, config::UPLOADED_FILE_NAME, http::response_envelope::ApiResponse},
    error_handler::{AppError, AppResult},
};

const PDF_MAGIC: &[u8] = b"%PDF-";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub path: String,
    pub bytes: usize,
    pub original_name: Option<String>,
}

/// Handler: POST /upload (multipart, first file field)
///
/// Replaces `{data_dir}/uploaded_file.pdf` in one rename, so a concurrent
/// index build sees either the old or the new document. The index is not
/// rebuilt.
///
/// # Example
/// ```bash
/// curl -F file=@paper.pdf http://127.0.0.1:8501/upload
/// ```
#[instrument(name = "upload_route", skip_all)]
pub async fn upload_pdf(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> AppResult<ApiResponse<UploadResponse>> {
    while let Some(field) = multipart.next_field().await? {
        if field.file_name().is_none() {
            continue;
        }
        let original_name = field.file_name().map(str::to_string);
        let bytes = field.bytes().await?;

        if !bytes.starts_with(PDF_MAGIC) {
            return Err(AppError::BadRequest(format!(
                "{} is not a PDF file",
                original_name.as_deref().unwrap_or("upload")
            )));
        }

        let dir = &state.config.data_dir;
        let path = dir.join(UPLOADED_FILE_NAME);
        tokio::fs::create_dir_all(dir).await.map_err(AppError::Server)?;
        let target = path.clone();
        let body = bytes.clone();
        tokio::task::spawn_blocking(move || replace_file(&target, &body))
            .await
            .map_err(std::io::Error::other)
            .and_then(|r| r)
            .map_err(AppError::Server)?;

        info!(path = %path.display(), bytes = bytes.len(), name = ?original_name, "pdf uploaded");
        return Ok(ApiResponse::success(UploadResponse {
            path: path.display().to_string(),
            bytes: bytes.len(),
            original_name,
        }));
    }

    Err(AppError::BadRequest("no file field in multipart body".into()))
}

/// Writes next to `path` and renames over it.
fn replace_file(path: &Path, body: &[u8]) -> std::io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = tempfile::Builder::new()
        .prefix(".upload")
        .suffix(".partial")
        .tempfile_in(dir)?;
    tmp.write_all(body)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
