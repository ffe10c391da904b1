//! Offline feature-hashing embedding model
//!
//! Each lowercased alphanumeric token is hashed with SHA-256; the digest
//! picks a bucket in `0..dimension` and a sign. Output is deterministic
//! across runs and platforms, which makes it usable without any network
//! access and in tests.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::{EmbedError, EmbedResult, EmbeddingModel};

/// Bag-of-words hashing embedder
#[derive(Debug, Clone)]
pub struct HashingModel {
    dimension: usize,
}

impl HashingModel {
    pub fn new(dimension: usize) -> EmbedResult<Self> {
        if dimension == 0 {
            return Err(EmbedError::Config(
                "hashing model dimension must be greater than zero".to_string(),
            ));
        }
        Ok(Self { dimension })
    }

    /// Raw term-frequency vector (unnormalized)
    pub fn encode_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for token in tokenize(text) {
            let digest = Sha256::digest(token.as_bytes());
            let mut bucket_bytes = [0u8; 8];
            bucket_bytes.copy_from_slice(&digest[..8]);
            let bucket = (u64::from_le_bytes(bucket_bytes) % self.dimension as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }
        vector
    }
}

#[async_trait]
impl EmbeddingModel for HashingModel {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn encode(&self, text: &str) -> EmbedResult<Vec<f32>> {
        Ok(self.encode_sync(text))
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::{l2_norm, Embedder, ModelLoader};
    use std::sync::Arc;

    struct HashingLoader(usize);

    #[async_trait]
    impl ModelLoader for HashingLoader {
        async fn load(&self) -> EmbedResult<Arc<dyn EmbeddingModel>> {
            Ok(Arc::new(HashingModel::new(self.0)?))
        }
    }

    #[test]
    fn test_zero_dimension_rejected() {
        assert!(matches!(HashingModel::new(0), Err(EmbedError::Config(_))));
    }

    #[test]
    fn test_deterministic_and_case_insensitive() {
        let model = HashingModel::new(64).unwrap();
        assert_eq!(model.encode_sync("Rust vectors"), model.encode_sync("rust VECTORS!"));
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let model = HashingModel::new(16).unwrap();
        assert_eq!(model.encode_sync(""), vec![0.0; 16]);
        assert_eq!(model.encode_sync("  \n\t "), vec![0.0; 16]);
    }

    #[tokio::test]
    async fn test_embedder_output_is_unit_length() {
        let embedder = Embedder::new(HashingLoader(32));
        for text in ["hello", "the quick brown fox", "a a a b"] {
            let v = embedder.embed(text).await.unwrap();
            assert_eq!(v.len(), 32);
            assert!((l2_norm(&v) - 1.0).abs() < 1e-5);
        }
    }

    #[tokio::test]
    async fn test_shared_tokens_score_higher() {
        let embedder = Embedder::new(HashingLoader(256));
        let a = embedder.embed("vector search engine").await.unwrap();
        let b = embedder.embed("search engine for vectors and text").await.unwrap();
        let c = embedder.embed("banana bread recipe").await.unwrap();

        let dot = |x: &[f32], y: &[f32]| x.iter().zip(y).map(|(p, q)| p * q).sum::<f32>();
        assert!(dot(&a, &b) > dot(&a, &c));
    }
}
