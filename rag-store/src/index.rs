//! Flat (exact) vector index with on-disk persistence.
//!
//! Layout of a persisted index directory:
//! - `index.json`: manifest + vectors, in index order
//! - `docstore.json`: chunks, in the same order
//!
//! Each file is written to a temp file in the same directory and renamed
//! into place.

use std::{io::Write, path::Path};

use ai_llm_service::EmbeddingModel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::{
    config::{DistanceKind, RagConfig},
    embed_pool::embed_chunks,
    errors::RagError,
    record::{Chunk, RagHit},
};

pub const INDEX_FILE: &str = "index.json";
pub const DOCSTORE_FILE: &str = "docstore.json";

/// Files making up a persisted index, in upload order.
pub const ARTIFACT_FILES: [&str; 2] = [INDEX_FILE, DOCSTORE_FILE];

const FORMAT_VERSION: u32 = 1;

/// Describes how an index was built.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub format_version: u32,
    pub embedding_model: String,
    pub dimension: usize,
    pub distance: DistanceKind,
    pub count: usize,
    pub built_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize)]
struct IndexFile {
    manifest: IndexManifest,
    vectors: Vec<Vec<f32>>,
}

/// Immutable in-memory index of `(chunk, vector)` pairs.
#[derive(Clone, Debug)]
pub struct VectorIndex {
    manifest: IndexManifest,
    chunks: Vec<Chunk>,
    vectors: Vec<Vec<f32>>,
}

impl VectorIndex {
    /// Assembles an index from already-computed vectors.
    ///
    /// # Errors
    /// - `NothingToIndex` if `chunks` is empty
    /// - `CorruptIndex` if chunk and vector counts differ
    /// - `VectorSizeMismatch` if vectors disagree on dimension
    pub fn from_parts(
        embedding_model: impl Into<String>,
        distance: DistanceKind,
        chunks: Vec<Chunk>,
        vectors: Vec<Vec<f32>>,
    ) -> Result<Self, RagError> {
        if chunks.is_empty() {
            return Err(RagError::NothingToIndex);
        }
        if chunks.len() != vectors.len() {
            return Err(RagError::CorruptIndex(format!(
                "{} chunks but {} vectors",
                chunks.len(),
                vectors.len()
            )));
        }
        let dimension = vectors[0].len();
        if dimension == 0 {
            return Err(RagError::CorruptIndex("zero-dimensional vectors".into()));
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
            return Err(RagError::VectorSizeMismatch {
                got: bad.len(),
                want: dimension,
            });
        }

        let manifest = IndexManifest {
            format_version: FORMAT_VERSION,
            embedding_model: embedding_model.into(),
            dimension,
            distance,
            count: chunks.len(),
            built_at: Utc::now(),
        };
        Ok(Self {
            manifest,
            chunks,
            vectors,
        })
    }

    /// Embeds all chunks and builds the index. Nothing is persisted here.
    pub async fn build(
        chunks: Vec<Chunk>,
        model: &dyn EmbeddingModel,
        cfg: &RagConfig,
    ) -> Result<Self, RagError> {
        if chunks.is_empty() {
            return Err(RagError::NothingToIndex);
        }
        let vectors = embed_chunks(&chunks, model, cfg.embed_concurrency).await?;
        let index = Self::from_parts(model.model_id(), cfg.distance, chunks, vectors)?;
        info!(
            count = index.len(),
            dimension = index.manifest.dimension,
            model = %index.manifest.embedding_model,
            "vector index built"
        );
        Ok(index)
    }

    pub fn manifest(&self) -> &IndexManifest {
        &self.manifest
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Exact top-`k` scan. Returns at most `min(k, len)` hits, best first;
    /// equal scores keep index order.
    ///
    /// # Errors
    /// `VectorSizeMismatch` if `query` has the wrong dimension.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<RagHit>, RagError> {
        if query.len() != self.manifest.dimension {
            return Err(RagError::VectorSizeMismatch {
                got: query.len(),
                want: self.manifest.dimension,
            });
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .map(|v| score(self.manifest.distance, query, v))
            .enumerate()
            .collect();
        // Stable sort: ties stay in index order.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k.min(self.len()));

        trace!("index::search k={k} hits={}", scored.len());
        Ok(scored
            .into_iter()
            .map(|(i, score)| RagHit {
                score,
                chunk: self.chunks[i].clone(),
            })
            .collect())
    }

    /// Writes `index.json` and `docstore.json` into `dir` (created if needed).
    pub async fn save(&self, dir: &Path) -> Result<(), RagError> {
        let index_bytes = serde_json::to_vec(&IndexFile {
            manifest: self.manifest.clone(),
            vectors: self.vectors.clone(),
        })?;
        let docstore_bytes = serde_json::to_vec_pretty(&self.chunks)?;

        let dir = dir.to_path_buf();
        tokio::task::spawn_blocking(move || -> Result<(), RagError> {
            std::fs::create_dir_all(&dir)?;
            write_atomic(&dir, DOCSTORE_FILE, &docstore_bytes)?;
            write_atomic(&dir, INDEX_FILE, &index_bytes)?;
            debug!("index::save dir={}", dir.display());
            Ok(())
        })
        .await
        .map_err(|e| RagError::Io(std::io::Error::other(e)))??;

        Ok(())
    }

    /// Reads an index directory written by [`VectorIndex::save`].
    ///
    /// `expected_model` is only compared for a warning; a different
    /// embedding model does not prevent loading.
    ///
    /// # Errors
    /// - `IndexMissing` if either file is absent
    /// - `Parse` for malformed JSON
    /// - `CorruptIndex` for count/dimension inconsistencies
    pub async fn load(dir: &Path, expected_model: Option<&str>) -> Result<Self, RagError> {
        let index_path = dir.join(INDEX_FILE);
        let docstore_path = dir.join(DOCSTORE_FILE);

        let index_bytes = read_artifact(dir, &index_path).await?;
        let docstore_bytes = read_artifact(dir, &docstore_path).await?;

        let IndexFile { manifest, vectors } = serde_json::from_slice(&index_bytes)?;
        let chunks: Vec<Chunk> = serde_json::from_slice(&docstore_bytes)?;

        if vectors.len() != chunks.len() || manifest.count != chunks.len() {
            return Err(RagError::CorruptIndex(format!(
                "manifest count {} / {} vectors / {} chunks",
                manifest.count,
                vectors.len(),
                chunks.len()
            )));
        }
        if let Some((i, v)) = vectors
            .iter()
            .enumerate()
            .find(|(_, v)| v.len() != manifest.dimension)
        {
            return Err(RagError::CorruptIndex(format!(
                "vector {i} has dimension {}, manifest says {}",
                v.len(),
                manifest.dimension
            )));
        }

        if let Some(expected) = expected_model.filter(|m| *m != manifest.embedding_model) {
            warn!(
                index_model = %manifest.embedding_model,
                configured_model = %expected,
                "index was built with a different embedding model; results may be meaningless"
            );
        }

        info!(
            dir = %dir.display(),
            count = manifest.count,
            built_at = %manifest.built_at,
            "vector index loaded"
        );
        Ok(Self {
            manifest,
            chunks,
            vectors,
        })
    }
}

/// Higher is closer.
fn score(kind: DistanceKind, a: &[f32], b: &[f32]) -> f32 {
    match kind {
        DistanceKind::Dot => dot(a, b),
        DistanceKind::Cosine => {
            let denom = dot(a, a).sqrt() * dot(b, b).sqrt();
            if denom == 0.0 { 0.0 } else { dot(a, b) / denom }
        }
        DistanceKind::Euclid => {
            let d = a
                .iter()
                .zip(b)
                .map(|(x, y)| (x - y) * (x - y))
                .sum::<f32>()
                .sqrt();
            1.0 / (1.0 + d)
        }
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

async fn read_artifact(dir: &Path, path: &Path) -> Result<Vec<u8>, RagError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(RagError::IndexMissing(dir.to_path_buf()))
        }
        Err(e) => Err(e.into()),
    }
}

fn write_atomic(dir: &Path, name: &str, bytes: &[u8]) -> Result<(), RagError> {
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(dir.join(name)).map_err(|e| RagError::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(i: usize) -> Chunk {
        Chunk::new("doc.pdf", 0, i, format!("chunk {i}"))
    }

    fn sample(distance: DistanceKind) -> VectorIndex {
        VectorIndex::from_parts(
            "test-embed",
            distance,
            (0..5).map(chunk).collect(),
            vec![
                vec![0.0, 0.0],
                vec![1.0, 0.0],
                vec![0.0, 1.0],
                vec![1.0, 1.0],
                vec![1.0, 0.0],
            ],
        )
        .unwrap()
    }

    fn ordinals(hits: &[RagHit]) -> Vec<usize> {
        hits.iter().map(|h| h.chunk.ordinal).collect()
    }

    #[test]
    fn euclid_orders_by_distance_and_breaks_ties_by_position() {
        let idx = sample(DistanceKind::Euclid);
        let hits = idx.search(&[1.0, 0.0], 3).unwrap();
        assert_eq!(ordinals(&hits), vec![1, 4, 0]);
        assert!((hits[0].score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_and_dot_rank_differently() {
        let cos = sample(DistanceKind::Cosine).search(&[2.0, 2.0], 1).unwrap();
        assert_eq!(ordinals(&cos), vec![3]);
        let dot = sample(DistanceKind::Dot).search(&[1.0, 0.0], 2).unwrap();
        assert_eq!(ordinals(&dot), vec![1, 3]);
    }

    #[test]
    fn returns_at_most_index_size() {
        let idx = VectorIndex::from_parts("m", DistanceKind::Euclid, vec![chunk(0), chunk(1)], vec![vec![1.0], vec![2.0]])
            .unwrap();
        assert_eq!(idx.search(&[0.0], 3).unwrap().len(), 2);
        assert!(idx.search(&[0.0, 1.0], 3).is_err());
    }

    #[test]
    fn rejects_empty_and_ragged_inputs() {
        assert!(matches!(
            VectorIndex::from_parts("m", DistanceKind::Euclid, vec![], vec![]),
            Err(RagError::NothingToIndex)
        ));
        assert!(matches!(
            VectorIndex::from_parts("m", DistanceKind::Euclid, vec![chunk(0), chunk(1)], vec![vec![1.0], vec![1.0, 2.0]]),
            Err(RagError::VectorSizeMismatch { got: 2, want: 1 })
        ));
    }

    #[tokio::test]
    async fn saved_index_reproduces_search_order() {
        let dir = tempfile::tempdir().unwrap();
        let idx = sample(DistanceKind::Euclid);
        idx.save(dir.path()).await.unwrap();

        let loaded = VectorIndex::load(dir.path(), Some("other-model")).await.unwrap();
        assert_eq!(loaded.manifest(), idx.manifest());
        for q in [[0.2, 0.9], [1.0, 0.0], [0.5, 0.5]] {
            assert_eq!(
                ordinals(&loaded.search(&q, 3).unwrap()),
                ordinals(&idx.search(&q, 3).unwrap())
            );
        }
    }

    #[tokio::test]
    async fn missing_and_corrupt_directories() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            VectorIndex::load(dir.path(), None).await,
            Err(RagError::IndexMissing(_))
        ));

        sample(DistanceKind::Euclid).save(dir.path()).await.unwrap();
        std::fs::write(dir.path().join(DOCSTORE_FILE), "[]").unwrap();
        assert!(matches!(
            VectorIndex::load(dir.path(), None).await,
            Err(RagError::CorruptIndex(_))
        ));
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn model_mismatch_warns_and_still_loads() {
        let dir = tempfile::tempdir().unwrap();
        let idx = sample(DistanceKind::Cosine);
        idx.save(dir.path()).await.unwrap();

        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let loaded = VectorIndex::load(dir.path(), Some("other-model")).await.unwrap();
        assert_eq!(loaded.manifest().embedding_model, "test-embed");
        assert_eq!(ordinals(&loaded.search(&[2.0, 2.0], 1).unwrap()), vec![3]);

        let out = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(out.contains("WARN"), "{out}");
        assert!(out.contains("different embedding model"), "{out}");
        assert!(out.contains("other-model"), "{out}");

        // Same model: nothing to warn about.
        logs.0.lock().unwrap().clear();
        VectorIndex::load(dir.path(), Some("test-embed")).await.unwrap();
        assert!(logs.0.lock().unwrap().is_empty());
    }
}
