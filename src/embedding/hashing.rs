//! Offline feature-hashing embedder.
//!
//! Lowercased alphanumeric tokens are hashed (FNV-1a) into a fixed number of
//! buckets and the counts are L2-normalised. Texts sharing a token always
//! have a positive cosine similarity.

use async_trait::async_trait;

use super::provider::EmbeddingService;
use crate::core::errors::ServiceError;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for token in tokens(text) {
            let bucket = (fnv1a(token.as_bytes()) % self.dimension as u64) as usize;
            vector[bucket] += 1.0;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for value in &mut vector {
                *value /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl EmbeddingService for HashingEmbedder {
    fn name(&self) -> &str {
        "hashing"
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ServiceError> {
        Ok(inputs.iter().map(|text| self.embed_text(text)).collect())
    }
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(FNV_PRIME)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::cosine_similarity;

    #[test]
    fn vectors_have_configured_dimension_and_unit_norm() {
        let embedder = HashingEmbedder::new(64);
        let vector = embedder.embed_text("Sharp Cheddar cheese");
        assert_eq!(vector.len(), 64);
        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn shared_tokens_give_positive_similarity() {
        let embedder = HashingEmbedder::new(256);
        let query = embedder.embed_text("sharp cheddar");
        let doc = embedder.embed_text("Product: Sharp Cheddar Category: Cheese Wheel");
        assert!(cosine_similarity(&query, &doc) > 0.0);
    }

    #[test]
    fn empty_text_is_zero_vector() {
        let embedder = HashingEmbedder::new(8);
        assert!(embedder.embed_text("  -- ").iter().all(|x| *x == 0.0));
    }

    #[test]
    fn embedding_is_deterministic() {
        let embedder = HashingEmbedder::new(32);
        assert_eq!(embedder.embed_text("brie"), embedder.embed_text("BRIE"));
    }
}
