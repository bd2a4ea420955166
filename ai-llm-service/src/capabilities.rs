//! Capability traits consumed by the retrieval pipeline.
//!
//! Orchestration code only ever sees these two traits, so any compliant
//! provider (or a test fake) can be swapped in without touching it.

pub use futures::future::BoxFuture;

use crate::error_handler::AiLlmError;

/// Turns a piece of text into a fixed-dimension vector.
pub trait EmbeddingModel: Send + Sync {
    /// Identifier of the embedding model (recorded in persisted indices).
    fn model_id(&self) -> &str;

    /// Embeds one text.
    fn embed<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<f32>, AiLlmError>>;
}

/// Generates a completion for a fully rendered prompt.
pub trait ChatModel: Send + Sync {
    /// Completes `prompt`. `max_tokens` overrides the configured output
    /// budget when `Some`.
    fn complete<'a>(
        &'a self,
        prompt: &'a str,
        max_tokens: Option<u32>,
    ) -> BoxFuture<'a, Result<String, AiLlmError>>;
}
