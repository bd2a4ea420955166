//! Chunking and retrieval configuration.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::RagError;

/// Distance function used for the vector space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceKind {
    /// Cosine similarity.
    Cosine,
    /// Dot product (useful for normalized vectors).
    Dot,
    /// Euclidean distance (L2). Scored as `1 / (1 + d)`.
    #[default]
    Euclid,
}

impl FromStr for DistanceKind {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cosine" => Ok(Self::Cosine),
            "dot" => Ok(Self::Dot),
            "euclid" | "euclidean" | "l2" => Ok(Self::Euclid),
            other => Err(RagError::Config(format!("unknown distance kind: {other}"))),
        }
    }
}

/// Configuration for ingestion and retrieval.
#[derive(Clone, Debug, PartialEq)]
pub struct RagConfig {
    /// Maximum chunk length, in characters.
    pub chunk_size: usize,
    /// Characters carried over between neighbouring chunks.
    pub chunk_overlap: usize,
    /// Number of chunks retrieved per question.
    pub top_k: usize,
    /// Distance function (Euclid by default).
    pub distance: DistanceKind,
    /// Maximum number of in-flight embedding requests.
    pub embed_concurrency: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 10_000,
            chunk_overlap: 1_000,
            top_k: 3,
            distance: DistanceKind::Euclid,
            embed_concurrency: 4,
        }
    }
}

impl RagConfig {
    /// Validates config values.
    pub fn validate(&self) -> Result<(), RagError> {
        if self.chunk_size == 0 {
            return Err(RagError::Config("chunk_size must be > 0".into()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.top_k == 0 {
            return Err(RagError::Config("top_k must be > 0".into()));
        }
        if self.embed_concurrency == 0 {
            return Err(RagError::Config("embed_concurrency must be > 0".into()));
        }
        Ok(())
    }
}
