//! Typed error for the contextor crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContextorError {
    /// Errors from the underlying rag-store crate (retrieval).
    #[error("RAG error: {0}")]
    Rag(#[from] rag_store::RagError),

    /// Embedding or chat service failure.
    #[error("LLM error: {0}")]
    Llm(#[from] ai_llm_service::AiLlmError),

    #[error("question is empty")]
    EmptyQuestion,
}
