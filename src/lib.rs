//! # Lorekeeper
//!
//! Retrieval orchestration engine for tabletop-RPG character assistants.
//!
//! Lorekeeper answers natural-language questions about a character by
//! combining several knowledge sources (character sheet, rules corpus,
//! session history) through language-model calls. Per query it decides which
//! sources are relevant, retrieves the most relevant passages from a
//! hierarchical document corpus with a multi-stage relevance score, and
//! synthesizes a single answer.
//!
//! ## Pipeline
//!
//! 1. Decision phase: one concurrent router call per knowledge source
//! 2. Retrieval phase: concurrent intent-scoped semantic retrieval
//! 3. Synthesis phase: one language-model call producing the answer
//!
//! Every stage except final synthesis degrades gracefully: a failed or
//! timed-out provider call drops that source instead of failing the query.
//!
//! ## Example
//!
//! ```rust,ignore
//! use lorekeeper::{KnowledgeSource, QueryOrchestrator, RetrievalEngine};
//!
//! let rules = RetrievalEngine::from_path("rules.corpus.json", embedder, cache, scoring)?;
//! let orchestrator = QueryOrchestrator::new(llm, config)
//!     .with_source(KnowledgeSource::new("rulebook", "the game rules", rules));
//! let answer = orchestrator.answer("can Yara cast fireball twice?", "yara");
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
// multiple_crate_versions is inherently crate-level (detects duplicate transitive dependencies).
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

// Module declarations
pub mod config;
pub mod corpus;
pub mod embedding;
pub mod llm;
pub mod models;
pub mod observability;
pub mod orchestrator;
pub mod retrieval;
pub mod taxonomy;

// Re-exports for convenience
pub use config::{
    CacheConfig, EmbeddingConfig, LlmConfig, LorekeeperConfig, OrchestratorConfig, ScoringConfig,
};
pub use corpus::{Corpus, CorpusBuilder};
pub use embedding::{Embedder, EmbeddingCache, HashEmbedder};
pub use llm::LlmProvider;
pub use models::{
    Document, Entity, PerformanceMetrics, RetrievalReport, RetrievalRequest, RouterDecision,
    SearchResult,
};
pub use orchestrator::{KnowledgeSource, QueryOrchestrator};
pub use retrieval::RetrievalEngine;
pub use taxonomy::{Category, Intent};

/// Error type for lorekeeper operations.
///
/// Uses `thiserror` for automatic `Display` and `Error` trait implementations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidInput` | Malformed document references, invalid intent/category names |
/// | `OperationFailed` | Provider HTTP calls fail, response parsing fails |
/// | `CorpusLoad` | The persisted corpus blob is missing, unreadable, or corrupt |
///
/// Provider failures are raised by the provider clients but recovered locally
/// by the retrieval engine and orchestrator; only `CorpusLoad` is fatal, and
/// only at engine construction time.
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    ///
    /// Raised when:
    /// - A document references a parent or child id that does not exist
    /// - The corpus violates the forest property (cycle, duplicate parent)
    /// - An unknown intent or category name is given on the CLI
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An operation failed.
    ///
    /// Raised when:
    /// - An LLM or embedding HTTP request fails or times out
    /// - A provider response cannot be parsed
    /// - Configuration files cannot be read or parsed
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// The persisted corpus could not be loaded.
    ///
    /// Fatal at retrieval-engine construction: the engine cannot function
    /// without its corpus, so this is never masked.
    #[error("failed to load corpus from '{path}': {cause}")]
    CorpusLoad {
        /// Path to the corpus blob.
        path: String,
        /// The underlying cause.
        cause: String,
    },
}

/// Result type alias for lorekeeper operations.
pub type Result<T> = std::result::Result<T, Error>;
