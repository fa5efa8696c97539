use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::provider::Generator;
use super::types::SamplingParams;
use crate::core::errors::RagError;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Google Generative Language API (`models/{model}:generateContent`).
#[derive(Clone)]
pub struct GeminiGenerator {
    base_url: String,
    model: String,
    api_key: String,
    params: SamplingParams,
    client: Client,
}

impl GeminiGenerator {
    pub fn new(
        base_url: Option<&str>,
        model: &str,
        api_key: &str,
        params: SamplingParams,
        timeout: Duration,
    ) -> Result<Self, RagError> {
        if api_key.trim().is_empty() {
            return Err(RagError::model("Gemini API key is not configured"));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(RagError::model)?;

        Ok(Self {
            base_url: base_url
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
            params,
            client,
        })
    }

    fn request_body(&self, prompt: &str) -> Value {
        let mut body = json!({
            "contents": [
                { "role": "user", "parts": [{ "text": prompt }] }
            ]
        });

        let mut generation_config = serde_json::Map::new();
        if let Some(t) = self.params.temperature {
            generation_config.insert("temperature".to_string(), json!(t));
        }
        if let Some(t) = self.params.max_tokens {
            generation_config.insert("maxOutputTokens".to_string(), json!(t));
        }
        if !generation_config.is_empty() {
            if let Some(obj) = body.as_object_mut() {
                obj.insert("generationConfig".to_string(), Value::Object(generation_config));
            }
        }

        body
    }
}

#[async_trait]
impl Generator for GeminiGenerator {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, prompt: &str) -> Result<String, RagError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );

        let res = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(RagError::generation)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(RagError::GenerationFailure(format!(
                "Gemini returned {}: {}",
                status, text
            )));
        }

        let payload: Value = res.json().await.map_err(RagError::generation)?;
        extract_text(&payload)
    }
}

/// Joins the text parts of the first candidate.
fn extract_text(payload: &Value) -> Result<String, RagError> {
    let parts = payload["candidates"][0]["content"]["parts"].as_array();
    let text: String = parts
        .map(|parts| {
            parts
                .iter()
                .filter_map(|part| part["text"].as_str())
                .collect()
        })
        .unwrap_or_default();

    if !text.is_empty() {
        return Ok(text);
    }

    if let Some(reason) = payload["promptFeedback"]["blockReason"].as_str() {
        return Err(RagError::GenerationFailure(format!(
            "Gemini blocked the prompt: {}",
            reason
        )));
    }
    Err(RagError::generation("Gemini response contained no text"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator() -> GeminiGenerator {
        GeminiGenerator::new(
            None,
            "gemini-2.5-flash",
            "key",
            SamplingParams {
                temperature: Some(0.2),
                max_tokens: None,
            },
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn extract_text_joins_parts_of_first_candidate() {
        let payload = json!({
            "candidates": [
                { "content": { "parts": [{ "text": "The library " }, { "text": "opens at 8 AM." }] } },
                { "content": { "parts": [{ "text": "ignored" }] } }
            ]
        });
        assert_eq!(extract_text(&payload).unwrap(), "The library opens at 8 AM.");
    }

    #[test]
    fn extract_text_reports_block_reason() {
        let payload = json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        let err = extract_text(&payload).unwrap_err();
        assert!(matches!(err, RagError::GenerationFailure(ref msg) if msg.contains("SAFETY")));
    }

    #[test]
    fn request_body_carries_prompt_and_sampling() {
        let body = generator().request_body("hello");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(body["generationConfig"]["temperature"], 0.2);
        assert!(body["generationConfig"].get("maxOutputTokens").is_none());
    }

    #[test]
    fn missing_key_is_model_unavailable() {
        let result = GeminiGenerator::new(
            None,
            "gemini-2.5-flash",
            "",
            SamplingParams::default(),
            Duration::from_secs(5),
        );
        assert!(matches!(result, Err(RagError::ModelUnavailable(_))));
    }
}
