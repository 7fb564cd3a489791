//! Deterministic local embeddings and vector math.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::errors::ApplicationError;
use crate::recommend::sources::EmbeddingProvider;

pub const DEFAULT_DIMENSION: usize = 256;

/// Provider name reported when the hash embedder is in use.
pub const FALLBACK_PROVIDER: &str = "fallback";

/// Bag-of-tokens embedding built from SHA-256 digests.
///
/// Each lower-cased whitespace token is hashed; every 4-byte window of the digest adds
/// `(le_u32 % 1000) / 1000` to bucket `digest[i] % dimension`. The result is L2-normalized,
/// so texts sharing tokens land close under cosine distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashEmbedder {
    dimension: usize,
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self { dimension: DEFAULT_DIMENSION }
    }
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension: dimension.max(1) }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; self.dimension];

        for token in text.to_lowercase().split_whitespace() {
            let digest = Sha256::digest(token.as_bytes());
            for idx in (0..digest.len()).step_by(4) {
                let chunk = [digest[idx], digest[idx + 1], digest[idx + 2], digest[idx + 3]];
                let value = (u32::from_le_bytes(chunk) % 1000) as f32 / 1000.0;
                vector[digest[idx] as usize % self.dimension] += value;
            }
        }

        normalize(&mut vector);
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    fn name(&self) -> &str {
        FALLBACK_PROVIDER
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, ApplicationError> {
        Ok(self.embed(text))
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ApplicationError> {
        Ok(texts.iter().map(|text| self.embed(text)).collect())
    }
}

/// Scale `vector` to unit length in place; zero vectors are left untouched.
pub fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}

/// `1 - cos(a, b)`, in `[0, 2]`.
///
/// Mismatched lengths compare over the shared prefix. A zero vector is maximally
/// uninformative and yields 1.0.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    let (mut dot, mut norm_a, mut norm_b) = (0.0_f64, 0.0_f64, 0.0_f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }

    (1.0 - dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(0.0, 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(vector: &[f32]) -> f32 {
        vector.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    #[test]
    fn embeddings_are_deterministic_and_unit_length() {
        let embedder = HashEmbedder::default();
        let first = embedder.embed("Nimbus Noise-Canceling Headphones");
        let second = embedder.embed("nimbus   noise-canceling HEADPHONES");

        assert_eq!(first.len(), DEFAULT_DIMENSION);
        assert_eq!(first, second);
        assert!((norm(&first) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn empty_text_embeds_to_zero_vector() {
        let vector = HashEmbedder::new(16).embed("   ");
        assert!(vector.iter().all(|x| *x == 0.0));
        assert_eq!(cosine_distance(&vector, &HashEmbedder::new(16).embed("lamp")), 1.0);
    }

    #[test]
    fn shared_tokens_are_closer_than_unrelated_text() {
        let embedder = HashEmbedder::default();
        let query = embedder.embed("desk lamp");
        let related = embedder.embed("Lumen Smart Desk Lamp with circadian presets");
        let unrelated = embedder.embed("Atlas Carry-On hard shell luggage");

        assert!(cosine_distance(&query, &related) < cosine_distance(&query, &unrelated));
    }

    #[test]
    fn cosine_distance_bounds() {
        assert!(cosine_distance(&[1.0, 0.0], &[1.0, 0.0]).abs() < 1e-12);
        assert!((cosine_distance(&[1.0, 0.0], &[0.0, 1.0]) - 1.0).abs() < 1e-12);
        assert!((cosine_distance(&[1.0, 0.0], &[-1.0, 0.0]) - 2.0).abs() < 1e-12);
    }

    #[tokio::test]
    async fn provider_reports_fallback_name() {
        let embedder = HashEmbedder::new(32);
        let documents = embedder
            .embed_documents(&["a".to_owned(), "b".to_owned()])
            .await
            .expect("embed documents");

        assert_eq!(embedder.name(), "fallback");
        assert_eq!(documents.len(), 2);
        assert_eq!(embedder.embed_query("a").await.expect("embed query"), documents[0]);
    }
}
