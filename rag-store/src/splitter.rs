//! Recursive character splitter.
//!
//! Text is cut on the first separator of `["\n\n", "\n", " ", ""]` that occurs
//! in it. Every piece keeps the separator that preceded it, so concatenating
//! the pieces reproduces the input. Small pieces are merged greedily up to
//! `chunk_size`; when a chunk is emitted the tail of at most `chunk_overlap`
//! characters is carried into the next one. Pieces that are still too long
//! are split again with the remaining separators.
//!
//! All lengths are counted in `char`s.

use std::collections::VecDeque;

use tracing::warn;

use crate::{
    config::RagConfig,
    errors::RagError,
    record::{Chunk, Document},
};

const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

#[derive(Clone, Debug)]
pub struct RecursiveCharacterSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveCharacterSplitter {
    /// # Errors
    /// `RagError::Config` unless `0 < chunk_overlap + 1 <= chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, RagError> {
        RagConfig {
            chunk_size,
            chunk_overlap,
            ..RagConfig::default()
        }
        .validate()?;
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn from_config(cfg: &RagConfig) -> Result<Self, RagError> {
        Self::new(cfg.chunk_size, cfg.chunk_overlap)
    }

    /// Splits `text` into trimmed, non-empty chunks.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &SEPARATORS)
    }

    /// Lazily splits documents into chunks, in document order.
    pub fn split_documents<'a, I>(&'a self, docs: I) -> impl Iterator<Item = Chunk> + 'a
    where
        I: IntoIterator<Item = Document>,
        I::IntoIter: 'a,
    {
        docs.into_iter().flat_map(move |doc| {
            self.split_text(&doc.text)
                .into_iter()
                .enumerate()
                .map(move |(ordinal, text)| Chunk::new(&doc.source, doc.page, ordinal, text))
        })
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        // First separator present in the text; "" always matches.
        let (idx, separator) = separators
            .iter()
            .enumerate()
            .find(|(_, s)| s.is_empty() || text.contains(**s))
            .map(|(i, s)| (i, *s))
            .unwrap_or((separators.len().saturating_sub(1), ""));
        let rest = separators.get(idx + 1..).unwrap_or(&[]);

        let mut out = Vec::new();
        let mut short: Vec<&str> = Vec::new();
        for piece in split_keeping_separator(text, separator) {
            if piece.chars().count() < self.chunk_size {
                short.push(piece);
                continue;
            }
            if !short.is_empty() {
                out.extend(self.merge(&short));
                short.clear();
            }
            if rest.is_empty() {
                let trimmed = piece.trim();
                if !trimmed.is_empty() {
                    out.push(trimmed.to_string());
                }
            } else {
                out.extend(self.split_recursive(piece, rest));
            }
        }
        if !short.is_empty() {
            out.extend(self.merge(&short));
        }
        out
    }

    /// Greedy merge of short pieces with a carried-over overlap window.
    fn merge(&self, pieces: &[&str]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: VecDeque<(&str, usize)> = VecDeque::new();
        let mut total = 0usize;

        for &piece in pieces {
            let len = piece.chars().count();
            if total + len > self.chunk_size {
                if total > self.chunk_size {
                    warn!(
                        "splitter: created a chunk of {total} chars, longer than chunk_size {}",
                        self.chunk_size
                    );
                }
                if !window.is_empty() {
                    push_trimmed(&mut chunks, &window);
                    while total > self.chunk_overlap
                        || (total + len > self.chunk_size && total > 0)
                    {
                        match window.pop_front() {
                            Some((_, n)) => total -= n,
                            None => break,
                        }
                    }
                }
            }
            window.push_back((piece, len));
            total += len;
        }
        push_trimmed(&mut chunks, &window);
        chunks
    }
}

fn push_trimmed(chunks: &mut Vec<String>, window: &VecDeque<(&str, usize)>) {
    let joined: String = window.iter().map(|(p, _)| *p).collect();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

/// Splits on `sep`, attaching each separator to the start of the piece that
/// follows it. An empty separator yields single characters.
fn split_keeping_separator<'t>(text: &'t str, sep: &str) -> Vec<&'t str> {
    if sep.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }
    let mut pieces = Vec::new();
    let mut start = 0;
    for (pos, _) in text.match_indices(sep) {
        if pos > start {
            pieces.push(&text[start..pos]);
        }
        start = pos;
    }
    // `start` points at the last separator (or 0); the final piece runs to the end.
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}
