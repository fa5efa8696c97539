//! Document chunking.
//!
//! Splits text into overlapping character windows, pulling each window's end
//! back to a sentence boundary when one sits in the window's final 20%.

use serde::{Deserialize, Serialize};

use crate::core::config::ChunkingConfig;

/// A bounded span of source text; the atomic retrieval unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    /// Source identifier (file name, upload name, ...).
    pub document_id: String,
    /// Position of the chunk within its document.
    pub sequence_index: usize,
    /// Character offset of the window start in the original document.
    #[serde(default)]
    pub start_offset: usize,
}

#[derive(Debug, Clone)]
pub struct Chunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Chunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            chunk_overlap,
        }
    }

    pub fn from_config(config: &ChunkingConfig) -> Self {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Splits `text` into chunks. Same input always yields the same boundaries.
    pub fn chunk(&self, document_id: &str, text: &str) -> Vec<Chunk> {
        let chars: Vec<char> = text.chars().collect();
        let total_chars = chars.len();
        let mut chunks = Vec::new();

        if total_chars == 0 {
            return chunks;
        }

        let mut start = 0;

        while start < total_chars {
            let end = (start + self.chunk_size).min(total_chars);
            let window = &chars[start..end];

            let cut = if end < total_chars {
                sentence_cut(window)
            } else {
                window.len()
            };

            let chunk_text: String = window[..cut].iter().collect();
            let trimmed = chunk_text.trim();
            if !trimmed.is_empty() {
                chunks.push(Chunk {
                    text: trimmed.to_string(),
                    document_id: document_id.to_string(),
                    sequence_index: chunks.len(),
                    start_offset: start,
                });
            }

            if end == total_chars {
                break;
            }
            // Overlap is measured back from where the chunk actually ended.
            start = (start + cut)
                .saturating_sub(self.chunk_overlap)
                .max(start + 1);
        }

        chunks
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self::from_config(&ChunkingConfig::default())
    }
}

/// Length of `window` up to and including the last sentence terminator in its
/// final 20%, or the full window when there is none.
fn sentence_cut(window: &[char]) -> usize {
    let search_start = (window.len() * 80) / 100;
    let last = window.len().saturating_sub(1);

    (search_start..last)
        .rev()
        .find(|&i| matches!(window[i], '.' | '!' | '?') && matches!(window[i + 1], ' ' | '\n'))
        .map(|i| i + 1)
        .unwrap_or(window.len())
}
