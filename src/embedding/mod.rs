//! Text embedding.
//!
//! `Embedder` is the seam between the retrieval engine and whatever model
//! produces vectors:
//! - `HashingEmbedder`: local, deterministic feature hashing (default)
//! - `RemoteEmbedder`: OpenAI-compatible `/v1/embeddings` endpoint

mod hashing;
mod remote;

use std::sync::Arc;

use async_trait::async_trait;

pub use hashing::HashingEmbedder;
pub use remote::RemoteEmbedder;

use crate::core::config::{EmbeddingBackend, EmbeddingConfig};
use crate::core::errors::RagError;

/// Dense vector for one text.
pub type Embedding = Vec<f32>;

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Identifier recorded in the index manifest.
    fn model_name(&self) -> &str;

    fn dimension(&self) -> usize;

    /// One vector per input, in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>, RagError>;

    async fn embed_one(&self, text: &str) -> Result<Embedding, RagError> {
        let mut vectors = self.embed(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| RagError::model("embedder returned no vector"))
    }
}

pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>, RagError> {
    match config.backend {
        EmbeddingBackend::Hashing => Ok(Arc::new(HashingEmbedder::new(config.dimension)?)),
        EmbeddingBackend::Remote => Ok(Arc::new(RemoteEmbedder::new(
            &config.base_url,
            &config.model,
            config.dimension,
            config.batch_size,
        )?)),
    }
}
