//! PDF discovery and page-level text extraction.

use std::{
    path::{Path, PathBuf},
    process::Stdio,
};

use ai_llm_service::BoxFuture;
use tokio::process::Command;
use tracing::{debug, info, trace, warn};
use walkdir::{DirEntry, WalkDir};

use crate::{errors::RagError, record::Document};

/// Form feed emitted by `pdftotext` between pages.
const PAGE_BREAK: char = '\u{c}';

/// Turns one file into its pages of text (index = 0-based page number).
pub trait TextExtractor: Send + Sync {
    fn extract_pages<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, Result<Vec<String>, RagError>>;
}

/// Extractor backed by poppler's `pdftotext` binary.
#[derive(Clone, Debug)]
pub struct PdfToText {
    bin: String,
}

impl PdfToText {
    pub fn new(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }
}

impl Default for PdfToText {
    fn default() -> Self {
        Self::new("pdftotext")
    }
}

impl TextExtractor for PdfToText {
    fn extract_pages<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, Result<Vec<String>, RagError>> {
        Box::pin(async move {
            let extract_err = |reason: String| RagError::Extract {
                path: path.to_path_buf(),
                reason,
            };

            trace!("loader::pdftotext bin={} path={}", self.bin, path.display());
            let output = Command::new(&self.bin)
                .arg("-enc")
                .arg("UTF-8")
                .arg(path)
                .arg("-")
                .stdin(Stdio::null())
                .kill_on_drop(true)
                .output()
                .await
                .map_err(|e| extract_err(format!("cannot run {} (is poppler installed?): {e}", self.bin)))?;

            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                return Err(extract_err(format!(
                    "{} exited with {}: {}",
                    self.bin,
                    output.status,
                    stderr.trim()
                )));
            }

            let text = String::from_utf8_lossy(&output.stdout);
            Ok(split_pages(&text))
        })
    }
}

/// Splits `pdftotext` output into pages. The trailing form feed after the
/// last page does not create an extra page.
pub fn split_pages(text: &str) -> Vec<String> {
    let body = text.strip_suffix(PAGE_BREAK).unwrap_or(text);
    body.split(PAGE_BREAK).map(str::to_string).collect()
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_string_lossy().starts_with('.')
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

/// Recursively lists `*.pdf` files under `dir` (sorted, hidden entries skipped).
///
/// # Errors
/// `RagError::Io` if `dir` is missing or unreadable.
pub fn discover_pdfs(dir: &Path) -> Result<Vec<PathBuf>, RagError> {
    if !dir.is_dir() {
        return Err(RagError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("document directory not found: {}", dir.display()),
        )));
    }

    let mut out = Vec::new();
    let walker = WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden(e));
    for entry in walker {
        let entry = entry.map_err(std::io::Error::from)?;
        if entry.file_type().is_file() && is_pdf(entry.path()) {
            out.push(entry.into_path());
        }
    }

    debug!("loader::discover_pdfs dir={} found={}", dir.display(), out.len());
    Ok(out)
}

/// Loads every PDF under `dir` as one [`Document`] per non-blank page.
///
/// # Errors
/// Directory errors, or the first extraction failure (naming the file).
pub async fn load_documents(
    dir: &Path,
    extractor: &dyn TextExtractor,
) -> Result<Vec<Document>, RagError> {
    let files = discover_pdfs(dir)?;
    if files.is_empty() {
        warn!("loader::load_documents no PDF files under {}", dir.display());
    }

    let mut docs = Vec::new();
    for path in &files {
        let pages = extractor.extract_pages(path).await?;
        let source = path.display().to_string();
        let before = docs.len();
        docs.extend(
            pages
                .into_iter()
                .enumerate()
                .filter(|(_, text)| !text.trim().is_empty())
                .map(|(page, text)| Document {
                    source: source.clone(),
                    page,
                    text,
                }),
        );
        debug!("loader::load_documents {} pages={}", source, docs.len() - before);
    }

    info!(files = files.len(), documents = docs.len(), "documents loaded");
    Ok(docs)
}
