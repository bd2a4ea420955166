//! Embedding executor with bounded concurrency and dimension checks.

use ai_llm_service::EmbeddingModel;
use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, info};

use crate::{errors::RagError, record::Chunk};

/// Embeds every chunk, returning vectors aligned 1:1 with `chunks`.
///
/// At most `concurrency` requests are in flight; results keep input order.
///
/// # Errors
/// - [`RagError::Embedding`] for the first failing chunk
/// - [`RagError::VectorSizeMismatch`] if the model returns vectors of different sizes
pub async fn embed_chunks(
    chunks: &[Chunk],
    model: &dyn EmbeddingModel,
    concurrency: usize,
) -> Result<Vec<Vec<f32>>, RagError> {
    info!(
        "embed_pool::embed_chunks: total={} concurrency={} model={}",
        chunks.len(),
        concurrency,
        model.model_id()
    );

    // Requests are keyed by position: a closure taking `&Chunk` would make
    // the stream's future non-`Send` for axum handlers.
    let requests = (0..chunks.len()).map(move |i| {
        let chunk = &chunks[i];
        async move {
            model
                .embed(&chunk.text)
                .await
                .map_err(|source| RagError::Embedding {
                    chunk: chunk.id.clone(),
                    source,
                })
        }
    });
    let vectors: Vec<Vec<f32>> = stream::iter(requests)
        .buffered(concurrency.max(1))
        .try_collect()
        .await?;

    if let Some(want) = vectors.first().map(Vec::len) {
        if let Some(bad) = vectors.iter().find(|v| v.len() != want) {
            return Err(RagError::VectorSizeMismatch {
                got: bad.len(),
                want,
            });
        }
        debug!("embed_pool::embed_chunks: dim={want}");
    }

    Ok(vectors)
}
