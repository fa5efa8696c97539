use async_trait::async_trait;

use crate::core::errors::RagError;

/// Opaque text generation: prompt in, text out.
///
/// Failures surface as `RagError::GenerationFailure`; retries and timeouts
/// belong to the implementation.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Provider name (e.g. "gemini", "openai").
    fn name(&self) -> &str;

    async fn generate(&self, prompt: &str) -> Result<String, RagError>;
}
