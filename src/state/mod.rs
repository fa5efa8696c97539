use std::sync::Arc;

use crate::core::config::{AppConfig, AppPaths, ConfigService};
use crate::embedding::Embedder;
use crate::history::SessionRegistry;
use crate::llm::{self, Generator};
use crate::rag::{AnswerRouter, ResourceCache, Retriever};

pub mod error;

use error::InitializationError;

/// Application state shared across all routes.
///
/// Contains references to:
/// - Configuration and paths
/// - The load-once embedder/corpus cache
/// - The answer router and its generation client
/// - Live chat sessions
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: ConfigService,
    pub settings: Arc<AppConfig>,
    pub resources: Arc<ResourceCache>,
    pub answers: Arc<AnswerRouter>,
    pub generator: Arc<dyn Generator>,
    pub sessions: SessionRegistry,
}

impl AppState {
    /// Initializes the application state.
    ///
    /// This process includes:
    /// 1. Loading and validating configuration
    /// 2. Building and warming the embedder (fatal on failure)
    /// 3. Creating the generation client (fatal on a missing key)
    ///
    /// The corpus index is loaded lazily on the first corpus question, so a
    /// missing index only degrades answering to open-domain.
    pub async fn initialize(paths: Arc<AppPaths>) -> Result<Arc<Self>, InitializationError> {
        let config = ConfigService::new(paths.clone());
        let settings = config
            .load_settings()
            .map_err(|e| InitializationError::Config(e.into()))?;

        let generator = llm::create_generator(&settings.generation)
            .map_err(|e| InitializationError::Generator(e.into()))?;

        let resources = Arc::new(ResourceCache::new(
            settings.embedding.clone(),
            paths.index_dir.clone(),
        ));
        resources
            .embedder()
            .await
            .map_err(|e| InitializationError::Embedder(e.into()))?;

        tracing::info!(
            "Initialized with generator '{}', index at {}",
            generator.name(),
            paths.index_dir.display()
        );
        Ok(Arc::new(Self::assemble(paths, settings, resources, generator)))
    }

    /// Assembles state from already constructed model clients.
    pub fn from_parts(
        paths: Arc<AppPaths>,
        settings: AppConfig,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
    ) -> Self {
        let resources = Arc::new(ResourceCache::with_embedder(
            embedder,
            paths.index_dir.clone(),
        ));
        Self::assemble(paths, settings, resources, generator)
    }

    fn assemble(
        paths: Arc<AppPaths>,
        settings: AppConfig,
        resources: Arc<ResourceCache>,
        generator: Arc<dyn Generator>,
    ) -> Self {
        let retriever = Retriever::new(
            resources.clone(),
            generator.clone(),
            settings.retrieval.clone(),
        );
        let answers = Arc::new(AnswerRouter::new(retriever, generator.clone()));

        Self {
            config: ConfigService::new(paths.clone()),
            paths,
            settings: Arc::new(settings),
            resources,
            answers,
            generator,
            sessions: SessionRegistry::new(),
        }
    }
}
