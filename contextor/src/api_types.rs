//! Public API types re-used by external crates (e.g., the HTTP API layer).

use serde::Serialize;

/// Options that control retrieval and generation for a single question.
///
/// # Example
/// ```
/// use contextor::AskOptions;
/// let opts = AskOptions::default();
/// assert_eq!(opts.top_k, 3);
/// assert_eq!(opts.max_tokens, 1000);
/// ```
#[derive(Clone, Debug)]
pub struct AskOptions {
    /// Number of chunks retrieved and placed in the prompt.
    pub top_k: usize,
    /// Output token budget for the chat model.
    pub max_tokens: u32,
}

impl Default for AskOptions {
    fn default() -> Self {
        Self {
            top_k: 3,
            max_tokens: 1000,
        }
    }
}

/// A context chunk that was fed to the LLM.
#[derive(Clone, Debug, Serialize)]
pub struct UsedChunk {
    pub id: String,
    pub score: f32,
    pub source: String,
    pub page: usize,
    pub text: String,
}

/// Final answer together with the exact context passed to the model.
#[derive(Clone, Debug, Serialize)]
pub struct QaAnswer {
    pub answer: String,
    pub context: Vec<UsedChunk>,
}
