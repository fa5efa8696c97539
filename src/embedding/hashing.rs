use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::{Embedder, Embedding};
use crate::core::errors::RagError;

const BIGRAM_WEIGHT: f32 = 0.5;

/// Feature-hashing embedder.
///
/// Lowercased alphanumeric tokens and adjacent-token bigrams are hashed with
/// SHA-256 into signed buckets, then L2-normalized. Output depends only on
/// the input text and the dimension.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
    model_name: String,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Result<Self, RagError> {
        if dimension == 0 {
            return Err(RagError::model("hashing embedder needs a positive dimension"));
        }
        Ok(Self {
            dimension,
            model_name: format!("hashing-{}", dimension),
        })
    }

    pub fn embed_text(&self, text: &str) -> Embedding {
        let mut vector = vec![0.0f32; self.dimension];
        let tokens = tokenize(text);

        for token in &tokens {
            self.accumulate(&mut vector, token, 1.0);
        }
        for pair in tokens.windows(2) {
            let bigram = format!("{} {}", pair[0], pair[1]);
            self.accumulate(&mut vector, &bigram, BIGRAM_WEIGHT);
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for value in &mut vector {
                *value /= norm;
            }
        }
        vector
    }

    fn accumulate(&self, vector: &mut [f32], feature: &str, weight: f32) {
        let digest = Sha256::digest(feature.as_bytes());
        let mut bucket_bytes = [0u8; 8];
        bucket_bytes.copy_from_slice(&digest[..8]);
        let bucket = (u64::from_le_bytes(bucket_bytes) % self.dimension as u64) as usize;
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
        vector[bucket] += sign * weight;
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>, RagError> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dot(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[tokio::test]
    async fn embeddings_are_bit_identical_across_calls() {
        let embedder = HashingEmbedder::new(384).unwrap();
        let texts = vec!["The library opens at 8 AM.".to_string()];
        let first = embedder.embed(&texts).await.unwrap();
        let second = HashingEmbedder::new(384).unwrap().embed(&texts).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn batch_preserves_order_and_dimension() {
        let embedder = HashingEmbedder::new(64).unwrap();
        let texts = vec!["alpha".to_string(), "beta".to_string(), "gamma".to_string()];
        let vectors = embedder.embed(&texts).await.unwrap();
        assert_eq!(vectors.len(), 3);
        assert!(vectors.iter().all(|v| v.len() == 64));
        assert_eq!(vectors[1], embedder.embed_one("beta").await.unwrap());
    }

    #[test]
    fn vectors_are_unit_length_and_case_insensitive() {
        let embedder = HashingEmbedder::new(128).unwrap();
        let vector = embedder.embed_text("Library HOURS");
        let norm = dot(&vector, &vector).sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
        assert_eq!(vector, embedder.embed_text("library hours"));
    }

    #[test]
    fn empty_text_maps_to_zero_vector() {
        let embedder = HashingEmbedder::new(16).unwrap();
        assert!(embedder.embed_text("  ...  ").iter().all(|x| *x == 0.0));
    }

    #[test]
    fn overlapping_vocabulary_scores_higher() {
        let embedder = HashingEmbedder::new(384).unwrap();
        let query = embedder.embed_text("When does the library open?");
        let related = embedder.embed_text("The library opens at 8 AM and closes at 10 PM.");
        let unrelated = embedder.embed_text("Tuition fees are payable every semester.");
        assert!(dot(&query, &related) > dot(&query, &unrelated));
    }

    #[test]
    fn zero_dimension_is_model_unavailable() {
        assert!(matches!(
            HashingEmbedder::new(0),
            Err(RagError::ModelUnavailable(_))
        ));
    }
}
