pub mod gemini;
pub mod openai;
pub mod provider;
pub mod types;

use std::env;
use std::sync::Arc;
use std::time::Duration;

pub use gemini::GeminiGenerator;
pub use openai::OpenAiGenerator;
pub use provider::Generator;
pub use types::{ChatMessage, SamplingParams};

use crate::core::config::{GenerationConfig, GenerationProvider};
use crate::core::errors::RagError;

/// Builds the configured generation client.
///
/// A missing Gemini key is `ModelUnavailable`, surfaced at startup.
pub fn create_generator(config: &GenerationConfig) -> Result<Arc<dyn Generator>, RagError> {
    let params = SamplingParams::from_config(config);
    let timeout = Duration::from_secs(config.timeout_secs);

    match config.provider {
        GenerationProvider::Gemini => {
            let api_key = config
                .api_key
                .clone()
                .or_else(|| env::var("GEMINI_API_KEY").ok())
                .unwrap_or_default();
            Ok(Arc::new(GeminiGenerator::new(
                config.base_url.as_deref(),
                &config.model,
                &api_key,
                params,
                timeout,
            )?))
        }
        GenerationProvider::OpenAi => Ok(Arc::new(OpenAiGenerator::new(
            config.base_url.as_deref(),
            &config.model,
            config.api_key.as_deref(),
            params,
            timeout,
        )?)),
    }
}
