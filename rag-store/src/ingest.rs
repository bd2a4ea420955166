//! Directory → chunks → index pipeline.

use std::path::Path;

use ai_llm_service::EmbeddingModel;
use tracing::info;

use crate::{
    config::RagConfig,
    errors::RagError,
    index::VectorIndex,
    loader::{TextExtractor, load_documents},
    record::Chunk,
    splitter::RecursiveCharacterSplitter,
};

/// Loads every PDF under `dir` and splits it into chunks.
pub async fn load_chunks(
    dir: &Path,
    extractor: &dyn TextExtractor,
    cfg: &RagConfig,
) -> Result<Vec<Chunk>, RagError> {
    let splitter = RecursiveCharacterSplitter::from_config(cfg)?;
    let docs = load_documents(dir, extractor).await?;
    let chunks: Vec<Chunk> = splitter.split_documents(docs).collect();
    info!(
        "ingest::load_chunks dir={} chunks={} size={} overlap={}",
        dir.display(),
        chunks.len(),
        cfg.chunk_size,
        cfg.chunk_overlap
    );
    Ok(chunks)
}

/// Builds an in-memory index from the PDFs under `data_dir` and persists it
/// to `index_dir`. The index is written only after every chunk is embedded.
pub async fn build_index(
    data_dir: &Path,
    index_dir: &Path,
    extractor: &dyn TextExtractor,
    model: &dyn EmbeddingModel,
    cfg: &RagConfig,
) -> Result<VectorIndex, RagError> {
    cfg.validate()?;
    let chunks = load_chunks(data_dir, extractor, cfg).await?;
    let index = VectorIndex::build(chunks, model, cfg).await?;
    index.save(index_dir).await?;
    info!(dir = %index_dir.display(), "vector index saved");
    Ok(index)
}
