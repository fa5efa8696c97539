use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::{Embedder, Embedding};
use crate::core::errors::RagError;

/// Embedder backed by an OpenAI-compatible `/v1/embeddings` endpoint
/// (llama.cpp server, LM Studio, Ollama).
#[derive(Clone)]
pub struct RemoteEmbedder {
    base_url: String,
    model: String,
    dimension: usize,
    batch_size: usize,
    client: Client,
}

impl RemoteEmbedder {
    pub fn new(
        base_url: &str,
        model: &str,
        dimension: usize,
        batch_size: usize,
    ) -> Result<Self, RagError> {
        if base_url.trim().is_empty() {
            return Err(RagError::model("embedding.base_url is required for the remote backend"));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(RagError::model)?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            dimension,
            batch_size: batch_size.max(1),
            client,
        })
    }

    async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Embedding>, RagError> {
        let url = format!("{}/v1/embeddings", self.base_url);
        let body = json!({
            "model": self.model,
            "input": inputs,
        });

        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(RagError::model)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(RagError::ModelUnavailable(format!(
                "embedding endpoint returned {}: {}",
                status, text
            )));
        }

        let payload: Value = res.json().await.map_err(RagError::model)?;
        let embeddings = parse_embeddings(&payload);

        if embeddings.len() != inputs.len() {
            return Err(RagError::ModelUnavailable(format!(
                "embedding endpoint returned {} vectors for {} inputs",
                embeddings.len(),
                inputs.len()
            )));
        }
        if let Some(bad) = embeddings.iter().find(|v| v.len() != self.dimension) {
            return Err(RagError::ModelUnavailable(format!(
                "embedding endpoint returned dimension {}, configured {}",
                bad.len(),
                self.dimension
            )));
        }

        Ok(embeddings)
    }
}

#[async_trait]
impl Embedder for RemoteEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>, RagError> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            embeddings.extend(self.embed_batch(batch).await?);
        }
        Ok(embeddings)
    }
}

/// Reads `data[].embedding`, honouring `index` when the server reorders results.
fn parse_embeddings(payload: &Value) -> Vec<Embedding> {
    let Some(data) = payload["data"].as_array() else {
        return Vec::new();
    };

    let mut indexed: Vec<(usize, Embedding)> = data
        .iter()
        .enumerate()
        .filter_map(|(fallback, item)| {
            let values = item["embedding"].as_array()?;
            let vector = values
                .iter()
                .filter_map(|v| v.as_f64().map(|f| f as f32))
                .collect();
            let index = item["index"].as_u64().map(|i| i as usize).unwrap_or(fallback);
            Some((index, vector))
        })
        .collect();

    indexed.sort_by_key(|(index, _)| *index);
    indexed.into_iter().map(|(_, vector)| vector).collect()
}
