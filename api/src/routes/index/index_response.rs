use chrono::{DateTime, Utc};
use rag_store::VectorIndex;
use serde::Serialize;

/// Response payload for POST /index.
#[derive(Debug, Serialize)]
pub struct IndexResponse {
    pub chunks: usize,
    pub dimension: usize,
    pub embedding_model: String,
    pub built_at: DateTime<Utc>,
    /// Object keys written to the bucket (empty without an object store).
    pub uploaded: Vec<String>,
}

impl IndexResponse {
    pub fn new(index: &VectorIndex, uploaded: Vec<String>) -> Self {
        let m = index.manifest();
        Self {
            chunks: index.len(),
            dimension: m.dimension,
            embedding_model: m.embedding_model.clone(),
            built_at: m.built_at,
            uploaded,
        }
    }
}
