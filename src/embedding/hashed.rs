//! Deterministic local embedder.

use super::Embedder;
use crate::Result;
use sha2::{Digest, Sha256};

/// Hash-based embedder producing deterministic pseudo-embeddings.
///
/// Each token is hashed into a handful of dimension buckets; the resulting
/// vector is L2-normalized. Texts sharing tokens get correlated vectors, so
/// ranking behaves sensibly for keyword-ish queries without any model or
/// network dependency. Used for offline builds without an API key and as the
/// default in tests.
pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    /// Default dimensionality.
    pub const DEFAULT_DIMENSIONS: usize = 384;

    /// Buckets touched per token.
    const BUCKETS_PER_TOKEN: usize = 4;

    /// Creates a hash embedder with the given dimensionality (minimum 8).
    #[must_use]
    pub const fn new(dimensions: usize) -> Self {
        Self {
            dimensions: if dimensions < 8 { 8 } else { dimensions },
        }
    }

    /// The model identifier recorded in corpora built with this embedder.
    #[must_use]
    pub fn model_id(&self) -> String {
        format!("hash-{}", self.dimensions)
    }

    fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DIMENSIONS)
    }
}

impl Embedder for HashEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0_f32; self.dimensions];
        for token in Self::tokenize(text) {
            let digest = Sha256::digest(token.as_bytes());
            for chunk in digest.chunks_exact(8).take(Self::BUCKETS_PER_TOKEN) {
                let mut bytes = [0_u8; 8];
                bytes.copy_from_slice(chunk);
                let value = u64::from_le_bytes(bytes);
                let index = (value % self.dimensions as u64) as usize;
                // alternate sign from a high bit so vectors are not all-positive
                let sign = if value & (1 << 63) == 0 { 1.0 } else { -1.0 };
                vector[index] += sign;
            }
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        Ok(vector)
    }
}
