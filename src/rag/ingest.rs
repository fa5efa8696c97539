//! Ingestion: documents → chunks → embeddings → index + store, in one pass.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use super::chunker::Chunker;
use super::corpus::{Corpus, IndexManifest};
use super::index::FlatIndex;
use super::store::CorpusStore;
use crate::core::errors::RagError;
use crate::document::{self, SourceDocument};
use crate::embedding::Embedder;

#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub documents: usize,
    pub chunks: usize,
    pub manifest: IndexManifest,
}

pub struct Ingestor {
    chunker: Chunker,
    embedder: Arc<dyn Embedder>,
}

impl Ingestor {
    pub fn new(chunker: Chunker, embedder: Arc<dyn Embedder>) -> Self {
        Self { chunker, embedder }
    }

    /// Builds index and store from the same chunk list so position *i* of
    /// both always refers to the same chunk.
    pub async fn build(&self, documents: &[SourceDocument]) -> Result<Corpus, RagError> {
        let chunks: Vec<_> = documents
            .iter()
            .flat_map(|doc| self.chunker.chunk(&doc.id, &doc.text))
            .collect();

        if chunks.is_empty() {
            return Err(RagError::InvalidInput(
                "No text could be extracted from the input documents".to_string(),
            ));
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed(&texts).await?;
        if vectors.len() != chunks.len() {
            return Err(RagError::ModelUnavailable(format!(
                "embedder returned {} vectors for {} chunks",
                vectors.len(),
                chunks.len()
            )));
        }

        let index = FlatIndex::build(&vectors)?;
        Corpus::new(index, CorpusStore::new(chunks), self.embedder.model_name())
    }

    /// Loads documents from `input`, builds the corpus and persists it to `output`.
    pub async fn ingest_path(&self, input: &Path, output: &Path) -> Result<IngestReport, RagError> {
        tracing::info!("Starting ingestion from {}", input.display());
        tracing::info!(
            "  Chunk size: {}, overlap: {}, embedder: {}",
            self.chunker.chunk_size(),
            self.chunker.chunk_overlap(),
            self.embedder.model_name()
        );

        let documents = document::load_directory(input)?;
        tracing::info!("Loaded {} documents", documents.len());

        let corpus = self.build(&documents).await?;
        let manifest = corpus.save(output)?;

        Ok(IngestReport {
            documents: documents.len(),
            chunks: corpus.len(),
            manifest,
        })
    }
}
