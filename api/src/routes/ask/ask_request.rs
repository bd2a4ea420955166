use contextor::UsedChunk;
use serde::{Deserialize, Serialize};

/// Request payload for POST /sessions/{id}/ask.
#[derive(Debug, Deserialize)]
pub struct AskRequest {
    /// Natural language question about the uploaded document.
    pub question: String,
}

/// Response payload for POST /sessions/{id}/ask.
#[derive(Debug, Serialize)]
pub struct AskResponse {
    /// Final model answer (plain text).
    pub answer: String,
    /// Chunks that were placed in the prompt, best first.
    pub context: Vec<UsedChunk>,
    /// Session length after this turn.
    pub turns: usize,
}
