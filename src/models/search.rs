//! Retrieval request/response types and observability counters.

use crate::taxonomy::Intent;
use serde::{Deserialize, Serialize};

/// Input to a retrieval engine query.
#[derive(Debug, Clone)]
pub struct RetrievalRequest {
    /// Query intent, used for category pruning.
    pub intent: Intent,
    /// The sub-query text to embed and score against.
    pub query_text: String,
    /// Entity names to boost.
    pub entities: Vec<String>,
    /// Context hints to blend in.
    pub context_hints: Vec<String>,
    /// Maximum number of results.
    pub k: usize,
}

impl RetrievalRequest {
    /// Creates a request with no entities or hints.
    #[must_use]
    pub fn new(intent: Intent, query_text: impl Into<String>, k: usize) -> Self {
        Self {
            intent,
            query_text: query_text.into(),
            entities: Vec::new(),
            context_hints: Vec::new(),
            k,
        }
    }

    /// Sets the entities to boost.
    #[must_use]
    pub fn with_entities(mut self, entities: Vec<String>) -> Self {
        self.entities = entities;
        self
    }

    /// Sets the context hints.
    #[must_use]
    pub fn with_context_hints(mut self, context_hints: Vec<String>) -> Self {
        self.context_hints = context_hints;
        self
    }
}

/// A single ranked retrieval result.
///
/// Ephemeral: produced per query and discarded after the synthesis phase.
/// `content` is a self-contained hierarchical excerpt (the document plus its
/// recursively concatenated descendants when `includes_descendants` is set).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Id of the matched document.
    pub document_id: String,
    /// Title of the matched document.
    pub title: String,
    /// Blended relevance score. Not bounded to [0, 1] after blending.
    pub score: f32,
    /// Entities that textually matched this document.
    pub matched_entities: Vec<String>,
    /// Context hints that textually matched this document.
    pub matched_context_hints: Vec<String>,
    /// Whether descendant content was folded into `content`.
    pub includes_descendants: bool,
    /// The assembled excerpt text.
    pub content: String,
}

/// Per-query timing and counter report from one retrieval engine call.
///
/// Observability only; never affects control flow.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RetrievalReport {
    /// Candidates remaining after category pruning.
    pub candidates: usize,
    /// Category pruning duration in milliseconds.
    pub prune_ms: u64,
    /// Semantic scoring duration in milliseconds.
    pub scoring_ms: u64,
    /// Entity boosting duration in milliseconds.
    pub boost_ms: u64,
    /// Context-hint blending duration in milliseconds.
    pub blend_ms: u64,
    /// Assembly duration in milliseconds.
    pub assemble_ms: u64,
    /// Embedding cache hits.
    pub cache_hits: u64,
    /// Embedding cache misses.
    pub cache_misses: u64,
    /// Embedding provider calls actually issued.
    pub provider_calls: u64,
}

impl RetrievalReport {
    /// Folds another report's counters into this one.
    pub fn merge(&mut self, other: &Self) {
        self.candidates += other.candidates;
        self.prune_ms += other.prune_ms;
        self.scoring_ms += other.scoring_ms;
        self.boost_ms += other.boost_ms;
        self.blend_ms += other.blend_ms;
        self.assemble_ms += other.assemble_ms;
        self.cache_hits += other.cache_hits;
        self.cache_misses += other.cache_misses;
        self.provider_calls += other.provider_calls;
    }
}

/// Per-answer timing breakdown from the orchestrator.
///
/// Observability only; never affects control flow.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// Decision phase duration in milliseconds.
    pub decision_ms: u64,
    /// Retrieval phase duration in milliseconds.
    pub retrieval_ms: u64,
    /// Synthesis phase duration in milliseconds.
    pub synthesis_ms: u64,
    /// Knowledge sources registered.
    pub sources_considered: usize,
    /// Sources whose decision came back `is_needed = true`.
    pub sources_needed: usize,
    /// Sources that contributed non-empty content to synthesis.
    pub sources_contributing: usize,
    /// Merged retrieval counters across contributing sources.
    pub retrieval: RetrievalReport,
}
