use thiserror::Error;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Failed to load configuration: {0}")]
    Config(#[source] anyhow::Error),

    #[error("Failed to initialize embedding model: {0}")]
    Embedder(#[source] anyhow::Error),

    #[error("Failed to initialize generation client: {0}")]
    Generator(#[source] anyhow::Error),
}
