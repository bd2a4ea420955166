//! Document side of the RAG pipeline.
//!
//! - PDF discovery and page extraction ([`TextExtractor`], [`PdfToText`])
//! - recursive character chunking ([`RecursiveCharacterSplitter`])
//! - embedding with bounded concurrency and a flat, exact [`VectorIndex`]
//! - persistence to a local directory and publishing to an object store
//!
//! The design is flat (no deep nesting) and splits responsibilities into focused modules.

mod artifact;
mod config;
mod embed_pool;
mod errors;
mod index;
mod ingest;
mod loader;
mod record;
mod splitter;

pub use artifact::{publish_index, restore_index};
pub use config::{DistanceKind, RagConfig};
pub use embed_pool::embed_chunks;
pub use errors::RagError;
pub use index::{ARTIFACT_FILES, DOCSTORE_FILE, INDEX_FILE, IndexManifest, VectorIndex};
pub use ingest::{build_index, load_chunks};
pub use loader::{PdfToText, TextExtractor, discover_pdfs, load_documents, split_pages};
pub use record::{Chunk, Document, RagHit};
pub use splitter::RecursiveCharacterSplitter;
