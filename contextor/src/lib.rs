//! RAG + LLM gateway with a single public function.
//!
//! Public API: [`ask`]. It embeds the question, retrieves the top-K chunks
//! from a [`VectorIndex`], fills the prompt template, calls the chat model,
//! and returns the answer together with the chunks it was given.

mod api_types;
mod error;
pub mod prompt;

pub use api_types::{AskOptions, QaAnswer, UsedChunk};
pub use error::ContextorError;

use ai_llm_service::{ChatModel, EmbeddingModel};
use rag_store::VectorIndex;
use tracing::{debug, info, instrument};

/// Answers `question` from the chunks of `index`.
///
/// # Errors
/// - [`ContextorError::EmptyQuestion`] for a blank question
/// - [`ContextorError::Llm`] if embedding or chat fails (no retry)
/// - [`ContextorError::Rag`] if the query vector does not fit the index
#[instrument(skip_all, fields(top_k = opts.top_k, index_len = index.len()))]
pub async fn ask(
    index: &VectorIndex,
    question: &str,
    embedder: &dyn EmbeddingModel,
    chat: &dyn ChatModel,
    opts: &AskOptions,
) -> Result<QaAnswer, ContextorError> {
    let question = question.trim();
    if question.is_empty() {
        return Err(ContextorError::EmptyQuestion);
    }

    // 1) Embed + retrieve
    let query = embedder.embed(question).await?;
    let hits = index.search(&query, opts.top_k)?;
    debug!("contextor::ask retrieved={}", hits.len());

    // 2) Prompt + chat
    let context = prompt::build_context(&hits);
    let rendered = prompt::render(&context, question);
    let answer = chat.complete(&rendered, Some(opts.max_tokens)).await?;
    info!(
        chunks = hits.len(),
        prompt_chars = rendered.len(),
        answer_chars = answer.len(),
        "question answered"
    );

    // 3) Used context for callers
    let context = hits
        .into_iter()
        .map(|h| UsedChunk {
            id: h.chunk.id,
            score: h.score,
            source: h.chunk.source,
            page: h.chunk.page,
            text: h.chunk.text,
        })
        .collect();

    Ok(QaAnswer { answer, context })
}
