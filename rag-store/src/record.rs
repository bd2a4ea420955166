//! Core data models used by the library.

use serde::{Deserialize, Serialize};

/// One page of extracted text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Document {
    /// Path of the source file, as discovered.
    pub source: String,
    /// 0-based page number within the source.
    pub page: usize,
    pub text: String,
}

/// A contiguous span of a document's text; the unit that gets embedded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// `"{source}#p{page}:{ordinal}"`
    pub id: String,
    pub source: String,
    pub page: usize,
    /// Position of the chunk within its page.
    pub ordinal: usize,
    pub text: String,
}

impl Chunk {
    pub fn new(source: &str, page: usize, ordinal: usize, text: String) -> Self {
        Self {
            id: format!("{source}#p{page}:{ordinal}"),
            source: source.to_string(),
            page,
            ordinal,
            text,
        }
    }
}

/// A single retrieval hit: higher score means closer.
#[derive(Clone, Debug, PartialEq)]
pub struct RagHit {
    pub score: f32,
    pub chunk: Chunk,
}
