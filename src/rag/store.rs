//! Corpus store — chunk metadata kept in index order.

use serde::{Deserialize, Serialize};

use super::chunker::Chunk;
use crate::core::errors::RagError;

/// Ordered chunk collection. Position *i* describes row *i* of the vector index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorpusStore {
    chunks: Vec<Chunk>,
}

impl CorpusStore {
    pub fn new(chunks: Vec<Chunk>) -> Self {
        Self { chunks }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&Chunk> {
        self.chunks.get(position)
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn to_json(&self) -> Result<Vec<u8>, RagError> {
        Ok(serde_json::to_vec_pretty(&self.chunks)?)
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, RagError> {
        let chunks: Vec<Chunk> = serde_json::from_slice(bytes)
            .map_err(|e| RagError::index(format!("chunk metadata is unreadable: {}", e)))?;
        Ok(Self { chunks })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_without_offsets_still_loads() {
        let json = br#"[{"text": "Opening hours", "document_id": "handbook.pdf", "sequence_index": 0}]"#;
        let store = CorpusStore::from_json(json).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(0).unwrap().start_offset, 0);
        assert!(store.get(1).is_none());
    }

    #[test]
    fn unreadable_metadata_is_index_unavailable() {
        assert!(matches!(
            CorpusStore::from_json(b"{not json"),
            Err(RagError::IndexUnavailable(_))
        ));
    }
}
