//! Intent-scoped semantic retrieval engine.
//!
//! Given an intent, query text, entities, and context hints, returns ranked,
//! hierarchically-expanded document excerpts. The stages run in a strict
//! order:
//!
//! 1. Category pruning (taxonomy lookup, no scoring)
//! 2. Semantic scoring (cosine similarity against precomputed vectors)
//! 3. Entity boosting (textual matches, diminishing returns on body hits)
//! 4. Context-hint blending (mean similarity to hint vectors)
//! 5. Assembly (top-k truncation, provenance, descendant expansion)
//!
//! Scoring is O(pruned corpus size) per query with no ANN index; that is the
//! design's scalability ceiling and is acceptable while the corpus stays in
//! the low thousands of documents.

use crate::config::ScoringConfig;
use crate::corpus::Corpus;
use crate::embedding::{Embedder, EmbeddingCache, zero_vector};
use crate::models::{Document, RetrievalReport, RetrievalRequest, SearchResult};
use crate::Result;
use std::sync::Arc;
use std::time::Instant;

/// Retrieval engine over one knowledge source's corpus.
pub struct RetrievalEngine {
    corpus: Arc<Corpus>,
    embedder: Arc<dyn Embedder>,
    cache: Arc<EmbeddingCache>,
    scoring: ScoringConfig,
}

/// A candidate document moving through the scoring stages.
struct Scored<'a> {
    doc: &'a Document,
    semantic: f32,
    score: f32,
}

impl RetrievalEngine {
    /// Creates an engine over an already-loaded corpus.
    #[must_use]
    pub fn new(
        corpus: Arc<Corpus>,
        embedder: Arc<dyn Embedder>,
        cache: Arc<EmbeddingCache>,
        scoring: ScoringConfig,
    ) -> Self {
        Self {
            corpus,
            embedder,
            cache,
            scoring,
        }
    }

    /// Creates an engine by loading a persisted corpus blob.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::CorpusLoad`] if the blob is missing or
    /// corrupt. This is the one fatal error in the retrieval path; the engine
    /// cannot function without its corpus.
    pub fn from_path(
        path: impl AsRef<std::path::Path>,
        embedder: Arc<dyn Embedder>,
        cache: Arc<EmbeddingCache>,
        scoring: ScoringConfig,
    ) -> Result<Self> {
        let corpus = Arc::new(Corpus::load(path)?);
        Ok(Self::new(corpus, embedder, cache, scoring))
    }

    /// The corpus this engine searches.
    #[must_use]
    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    /// Runs the staged retrieval pipeline.
    ///
    /// Never fails: an empty post-pruning candidate set returns an empty
    /// list, and per-text embedding failures degrade to zero vectors so the
    /// ranking stays total-ordered.
    #[must_use]
    pub fn query(&self, request: &RetrievalRequest) -> (Vec<SearchResult>, RetrievalReport) {
        let span = tracing::info_span!(
            "retrieval.query",
            intent = request.intent.as_str(),
            k = request.k
        );
        let _enter = span.enter();
        let mut report = RetrievalReport::default();

        // Stage 1: category pruning
        let start = Instant::now();
        let candidates = self.prune(request);
        report.prune_ms = elapsed_ms(start);
        report.candidates = candidates.len();
        if candidates.is_empty() {
            tracing::debug!(intent = request.intent.as_str(), "no candidates after pruning");
            return (Vec::new(), report);
        }

        // Stage 2: semantic scoring
        let start = Instant::now();
        let query_vector = self.embed_cached(&request.query_text, &mut report);
        let mut scored: Vec<Scored<'_>> = candidates
            .into_iter()
            .filter_map(|doc| {
                // documents without a vector are skipped, not scored as zero
                let embedding = doc.embedding.as_ref()?;
                let semantic = cosine_similarity(&query_vector, embedding);
                Some(Scored {
                    doc,
                    semantic,
                    score: semantic,
                })
            })
            .collect();
        sort_by_score(&mut scored);
        report.scoring_ms = elapsed_ms(start);

        // Stage 3: entity boosting
        let start = Instant::now();
        if !request.entities.is_empty() {
            for item in &mut scored {
                let boost = self.entity_boost(item.doc, &request.entities);
                item.score = self
                    .scoring
                    .semantic_weight
                    .mul_add(item.semantic, self.scoring.entity_weight * boost);
            }
            sort_by_score(&mut scored);
        }
        report.boost_ms = elapsed_ms(start);

        // Stage 4: context-hint blending
        let start = Instant::now();
        if !request.context_hints.is_empty() {
            let hint_vectors = self.embed_hints(&request.context_hints, &mut report);
            for item in &mut scored {
                if let Some(embedding) = item.doc.embedding.as_ref() {
                    let mean = mean_similarity(embedding, &hint_vectors);
                    item.score = self
                        .scoring
                        .blend_weight
                        .mul_add(item.score, self.scoring.hint_weight * mean);
                }
            }
            sort_by_score(&mut scored);
        }
        report.blend_ms = elapsed_ms(start);

        // Stage 5: assembly
        let start = Instant::now();
        scored.truncate(request.k);
        let results = scored
            .iter()
            .map(|item| self.assemble(item, request))
            .collect();
        report.assemble_ms = elapsed_ms(start);

        metrics::counter!("retrieval_queries_total", "intent" => request.intent.as_str())
            .increment(1);
        metrics::histogram!("retrieval_candidates").record(report.candidates as f64);

        (results, report)
    }

    /// Stage 1: keep only documents whose effective categories intersect the
    /// intent's targets. An intent with no mapping searches the full corpus.
    fn prune(&self, request: &RetrievalRequest) -> Vec<&Document> {
        let targets = request.intent.categories();
        if targets.is_empty() {
            return self.corpus.documents().collect();
        }
        self.corpus
            .documents()
            .filter(|doc| {
                self.corpus
                    .effective_categories(&doc.id)
                    .iter()
                    .any(|c| targets.contains(c))
            })
            .collect()
    }

    /// Accumulated textual boost for one document across all entities.
    fn entity_boost(&self, doc: &Document, entities: &[String]) -> f32 {
        let title = doc.title.to_lowercase();
        let id = doc.id.to_lowercase();
        let content = doc.content.to_lowercase();

        let mut boost = 0.0;
        for entity in entities {
            let needle = entity.to_lowercase();
            if needle.is_empty() {
                continue;
            }
            if title.contains(&needle) {
                boost += self.scoring.title_boost;
            }
            if id.contains(&needle) {
                boost += self.scoring.id_boost;
            }
            let occurrences = count_occurrences(&content, &needle);
            if occurrences > 0 {
                boost += (self.scoring.body_boost_per_occurrence * occurrences as f32)
                    .min(self.scoring.body_boost_cap);
            }
        }
        boost
    }

    /// Embeds one text through the cache, degrading to a zero vector on
    /// provider failure. Failed embeddings are not cached, so a transient
    /// provider error does not poison later queries.
    fn embed_cached(&self, text: &str, report: &mut RetrievalReport) -> Vec<f32> {
        if let Some(vector) = self.cache.get(text) {
            report.cache_hits += 1;
            return vector;
        }
        report.cache_misses += 1;
        report.provider_calls += 1;
        match self.embedder.embed(text) {
            Ok(vector) => {
                self.cache.put(text, vector.clone());
                vector
            },
            Err(err) => {
                tracing::warn!(error = %err, "embedding provider failed, using zero vector");
                metrics::counter!("embedding_failures_total").increment(1);
                zero_vector(self.embedder.dimensions())
            },
        }
    }

    /// Embeds all hints with one batched provider call for the cache misses.
    fn embed_hints(&self, hints: &[String], report: &mut RetrievalReport) -> Vec<Vec<f32>> {
        let mut vectors: Vec<Option<Vec<f32>>> = Vec::with_capacity(hints.len());
        let mut missing: Vec<usize> = Vec::new();
        for (i, hint) in hints.iter().enumerate() {
            match self.cache.get(hint) {
                Some(vector) => {
                    report.cache_hits += 1;
                    vectors.push(Some(vector));
                },
                None => {
                    report.cache_misses += 1;
                    missing.push(i);
                    vectors.push(None);
                },
            }
        }

        if !missing.is_empty() {
            let texts: Vec<&str> = missing.iter().map(|&i| hints[i].as_str()).collect();
            report.provider_calls += 1;
            match self.embedder.embed_batch(&texts) {
                Ok(batch) if batch.len() == missing.len() => {
                    for (&i, vector) in missing.iter().zip(batch) {
                        self.cache.put(&hints[i], vector.clone());
                        vectors[i] = Some(vector);
                    }
                },
                Ok(batch) => {
                    tracing::warn!(
                        expected = missing.len(),
                        got = batch.len(),
                        "embedding provider returned wrong batch size, using zero vectors"
                    );
                },
                Err(err) => {
                    tracing::warn!(error = %err, "hint embedding failed, using zero vectors");
                    metrics::counter!("embedding_failures_total").increment(1);
                },
            }
        }

        let dims = self.embedder.dimensions();
        vectors
            .into_iter()
            .map(|v| v.unwrap_or_else(|| zero_vector(dims)))
            .collect()
    }

    /// Stage 5 for one hit: provenance matches and hierarchical excerpt.
    fn assemble(&self, item: &Scored<'_>, request: &RetrievalRequest) -> SearchResult {
        let doc = item.doc;
        let title = doc.title.to_lowercase();
        let id = doc.id.to_lowercase();
        let content = doc.content.to_lowercase();

        let matched_entities = request
            .entities
            .iter()
            .filter(|e| {
                let needle = e.to_lowercase();
                !needle.is_empty()
                    && (title.contains(&needle) || id.contains(&needle) || content.contains(&needle))
            })
            .cloned()
            .collect();

        let matched_context_hints = request
            .context_hints
            .iter()
            .filter(|h| {
                let needle = h.to_lowercase();
                !needle.is_empty() && content.contains(&needle)
            })
            .cloned()
            .collect();

        let (excerpt, includes_descendants) = self
            .corpus
            .assemble_excerpt(&doc.id)
            .unwrap_or_else(|| (doc.content.clone(), false));

        SearchResult {
            document_id: doc.id.clone(),
            title: doc.title.clone(),
            score: item.score,
            matched_entities,
            matched_context_hints,
            includes_descendants,
            content: excerpt,
        }
    }
}

/// Cosine similarity between two vectors; 0.0 on dimension mismatch or a
/// zero-norm side, keeping the ordering total under degraded inputs.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0_f32;
    let mut norm_a = 0.0_f32;
    let mut norm_b = 0.0_f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a <= 0.0 || norm_b <= 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Mean cosine similarity of one vector against a set of vectors.
fn mean_similarity(embedding: &[f32], vectors: &[Vec<f32>]) -> f32 {
    if vectors.is_empty() {
        return 0.0;
    }
    let sum: f32 = vectors
        .iter()
        .map(|v| cosine_similarity(embedding, v))
        .sum();
    sum / vectors.len() as f32
}

fn sort_by_score(scored: &mut [Scored<'_>]) {
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
}

/// Non-overlapping occurrence count of `needle` in `haystack`.
fn count_occurrences(haystack: &str, needle: &str) -> usize {
    if needle.is_empty() {
        return 0;
    }
    haystack.matches(needle).count()
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}
