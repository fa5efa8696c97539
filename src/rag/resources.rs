//! Lazily loaded, process-wide retrieval resources.
//!
//! The embedder and the persisted corpus are loaded on first use and shared
//! afterwards. A failed load is not cached; the next caller retries.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::OnceCell;

use super::corpus::Corpus;
use crate::core::config::EmbeddingConfig;
use crate::core::errors::RagError;
use crate::embedding::{self, Embedder};

pub struct ResourceCache {
    embedding_config: EmbeddingConfig,
    index_dir: PathBuf,
    embedder: OnceCell<Arc<dyn Embedder>>,
    corpus: OnceCell<Arc<Corpus>>,
}

impl ResourceCache {
    pub fn new(embedding_config: EmbeddingConfig, index_dir: PathBuf) -> Self {
        Self {
            embedding_config,
            index_dir,
            embedder: OnceCell::new(),
            corpus: OnceCell::new(),
        }
    }

    /// Uses an already constructed embedder instead of building one from config.
    pub fn with_embedder(embedder: Arc<dyn Embedder>, index_dir: PathBuf) -> Self {
        Self {
            embedding_config: EmbeddingConfig::default(),
            index_dir,
            embedder: OnceCell::new_with(Some(embedder)),
            corpus: OnceCell::new(),
        }
    }

    pub fn index_dir(&self) -> &PathBuf {
        &self.index_dir
    }

    /// Returns the shared embedder, constructing and warming it on first use.
    pub async fn embedder(&self) -> Result<Arc<dyn Embedder>, RagError> {
        self.embedder
            .get_or_try_init(|| async {
                let embedder = embedding::create_embedder(&self.embedding_config)?;
                embedder
                    .embed_one("warm-up")
                    .await
                    .map_err(|e| RagError::model(format!("embedder warm-up failed: {}", e)))?;
                tracing::info!("Embedder ready: {}", embedder.model_name());
                Ok::<_, RagError>(embedder)
            })
            .await
            .cloned()
    }

    /// Returns the shared corpus, loading it from the index directory on first use.
    pub async fn corpus(&self) -> Result<Arc<Corpus>, RagError> {
        self.corpus
            .get_or_try_init(|| async {
                let (corpus, manifest) = Corpus::load(&self.index_dir)?;
                let embedder = self.embedder().await?;

                if manifest.dimension != embedder.dimension() {
                    return Err(RagError::index(format!(
                        "index dimension {} does not match embedder dimension {}",
                        manifest.dimension,
                        embedder.dimension()
                    )));
                }
                if manifest.embedder_model != embedder.model_name() {
                    tracing::warn!(
                        "Index was built with '{}' but queries use '{}'",
                        manifest.embedder_model,
                        embedder.model_name()
                    );
                }

                tracing::info!(
                    "Loaded corpus index from {} ({} chunks)",
                    self.index_dir.display(),
                    corpus.len()
                );
                Ok::<_, RagError>(Arc::new(corpus))
            })
            .await
            .cloned()
    }

    pub fn corpus_loaded(&self) -> bool {
        self.corpus.initialized()
    }
}
