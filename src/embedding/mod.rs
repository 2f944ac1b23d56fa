//! Embedding generation and caching.
//!
//! Provides the [`Embedder`] trait, an OpenAI-compatible HTTP provider, a
//! deterministic local hash embedder, and the LRU [`EmbeddingCache`].

// Allow cast precision loss for hash-based embedding calculations.
#![allow(clippy::cast_precision_loss)]
// Allow cast possible truncation for hash index calculations on 32-bit platforms.
#![allow(clippy::cast_possible_truncation)]

mod cache;
mod hashed;
mod openai;

pub use cache::EmbeddingCache;
pub use hashed::HashEmbedder;
pub use openai::OpenAiEmbedder;

use crate::Result;

/// Trait for embedding generators.
pub trait Embedder: Send + Sync {
    /// Returns the embedding dimensions.
    fn dimensions(&self) -> usize;

    /// Generates an embedding for the given text.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding generation fails.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generates embeddings for multiple texts.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding generation fails.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

/// A deterministic zero vector of the given dimensionality.
///
/// Used when a provider call fails for a single text: ranking stays
/// total-ordered and the affected item sinks toward the bottom instead of
/// aborting the query.
#[must_use]
pub fn zero_vector(dimensions: usize) -> Vec<f32> {
    vec![0.0; dimensions]
}
