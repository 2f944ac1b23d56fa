//! Integration tests for corpus persistence and the retrieval pipeline.
#![allow(clippy::expect_used, clippy::unwrap_used)]

use lorekeeper::config::ScoringConfig;
use lorekeeper::corpus::{Corpus, CorpusBuilder};
use lorekeeper::embedding::{Embedder, EmbeddingCache};
use lorekeeper::models::{Document, Entity, RetrievalRequest};
use lorekeeper::retrieval::RetrievalEngine;
use lorekeeper::taxonomy::{Category, Intent};
use lorekeeper::Result;
use std::sync::{Arc, Mutex};

/// Keyword-routed embedder with a provider call counter.
struct CountingEmbedder {
    calls: Mutex<usize>,
}

impl CountingEmbedder {
    fn new() -> Self {
        Self {
            calls: Mutex::new(0),
        }
    }

    fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl Embedder for CountingEmbedder {
    fn dimensions(&self) -> usize {
        3
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        *self.calls.lock().unwrap() += 1;
        let lower = text.to_lowercase();
        Ok(if lower.contains("fire") || lower.contains("explosion") {
            vec![1.0, 0.1, 0.0]
        } else if lower.contains("ice") || lower.contains("cold") {
            vec![0.2, 1.0, 0.1]
        } else {
            vec![0.0, 0.1, 1.0]
        })
    }
}

fn spell_corpus() -> Corpus {
    let mut builder = CorpusBuilder::new("counting-3");
    builder
        .push_document(
            Document::new(
                "spells/fireball",
                "Fireball",
                "A bright streak blossoms into an explosion of flame. 8d6 fire damage.",
            )
            .with_categories(vec![Category::Spellcasting])
            .with_embedding(vec![1.0, 0.0, 0.0]),
        )
        .unwrap();
    builder
        .push_document(
            Document::new(
                "spells/ice-storm",
                "Ice Storm",
                "Hail hammers the ground. 2d8 bludgeoning and 4d6 cold damage.",
            )
            .with_categories(vec![Category::Spellcasting])
            .with_embedding(vec![0.3, 1.0, 0.0]),
        )
        .unwrap();
    builder
        .push_document(
            Document::new(
                "skills/stealth",
                "Stealth",
                "Slip away unseen or sneak up on enemies.",
            )
            .with_categories(vec![Category::Abilities])
            .with_embedding(vec![0.0, 0.0, 1.0]),
        )
        .unwrap();
    builder
        .push_entity(Entity::new("Fireball", "spell").with_document("spells/fireball"))
        .unwrap();
    builder.into_corpus_unembedded().unwrap()
}

fn engine(corpus: Corpus, embedder: Arc<dyn Embedder>) -> RetrievalEngine {
    RetrievalEngine::new(
        Arc::new(corpus),
        embedder,
        Arc::new(EmbeddingCache::new(64)),
        ScoringConfig::default(),
    )
}

#[test]
fn test_intent_scoped_ranking() {
    let engine = engine(spell_corpus(), Arc::new(CountingEmbedder::new()));
    let request = RetrievalRequest::new(Intent::SpellDetails, "explosion, fire damage", 10);
    let (results, report) = engine.query(&request);

    // the abilities document never appears for a spellcasting intent
    assert_eq!(report.candidates, 2);
    assert_eq!(results[0].document_id, "spells/fireball");
    assert_eq!(results[1].document_id, "spells/ice-storm");
    assert!(results[0].score > results[1].score);
}

#[test]
fn test_identical_queries_hit_the_cache() {
    let embedder = Arc::new(CountingEmbedder::new());
    let engine = engine(spell_corpus(), Arc::clone(&embedder) as Arc<dyn Embedder>);
    let request = RetrievalRequest::new(Intent::SpellDetails, "fire damage", 10);

    let (_, first) = engine.query(&request);
    let (_, second) = engine.query(&request);

    assert_eq!(first.provider_calls, 1);
    assert_eq!(second.provider_calls, 0);
    assert_eq!(second.cache_hits, 1);
    // exactly one provider call total for byte-identical query text
    assert_eq!(embedder.calls(), 1);
}

#[test]
fn test_results_never_exceed_k() {
    let engine = engine(spell_corpus(), Arc::new(CountingEmbedder::new()));
    for k in 0..5 {
        let request = RetrievalRequest::new(Intent::General, "anything", k);
        let (results, _) = engine.query(&request);
        assert!(results.len() <= k);
        assert!(results.len() <= 3);
    }
}

#[test]
fn test_category_inheritance_from_nearest_ancestor() {
    let mut builder = CorpusBuilder::new("counting-3");
    builder
        .push_document(
            Document::new("rules", "Rules", "Top-level rules.")
                .with_categories(vec![Category::Combat])
                .with_embedding(vec![1.0, 0.0, 0.0]),
        )
        .unwrap();
    // no categories of its own: inherits Combat from "rules"
    builder
        .push_document(
            Document::new("rules/grappling", "Grappling", "How to grapple.")
                .with_parent("rules")
                .with_embedding(vec![0.9, 0.1, 0.0]),
        )
        .unwrap();
    // explicit assignment stops inheritance
    builder
        .push_document(
            Document::new("rules/downtime", "Downtime", "Activities between adventures.")
                .with_parent("rules")
                .with_categories(vec![Category::Adventuring])
                .with_embedding(vec![0.0, 1.0, 0.0]),
        )
        .unwrap();
    let corpus = builder.into_corpus_unembedded().unwrap();

    assert_eq!(corpus.effective_categories("rules/grappling"), &[Category::Combat]);
    assert_eq!(
        corpus.effective_categories("rules/downtime"),
        &[Category::Adventuring]
    );

    let engine = engine(corpus, Arc::new(CountingEmbedder::new()));
    let (results, report) = engine.query(&RetrievalRequest::new(Intent::AttackRoll, "grapple", 10));
    assert_eq!(report.candidates, 2);
    assert!(results.iter().all(|r| r.document_id != "rules/downtime"));
}

#[test]
fn test_descendant_content_folded_into_excerpt() {
    let mut builder = CorpusBuilder::new("counting-3");
    builder
        .push_document(
            Document::new("spells", "Spells", "The spell list.")
                .with_categories(vec![Category::Spellcasting])
                .with_embedding(vec![1.0, 0.0, 0.0]),
        )
        .unwrap();
    builder
        .push_document(
            Document::new("spells/shield", "Shield", "+5 AC until your next turn.")
                .with_parent("spells")
                .with_embedding(vec![0.5, 0.5, 0.0]),
        )
        .unwrap();
    let corpus = builder.into_corpus_unembedded().unwrap();

    let engine = engine(corpus, Arc::new(CountingEmbedder::new()));
    let (results, _) = engine.query(&RetrievalRequest::new(Intent::SpellDetails, "fire", 1));
    let top = &results[0];
    assert_eq!(top.document_id, "spells");
    assert!(top.includes_descendants);
    assert!(top.content.contains("+5 AC"));
}

#[test]
fn test_corpus_round_trip_preserves_everything() {
    let corpus = spell_corpus();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rules.corpus.json");

    corpus.save(&path).unwrap();
    let loaded = Corpus::load(&path).unwrap();

    assert_eq!(loaded.len(), corpus.len());
    assert_eq!(loaded.embedding_model(), corpus.embedding_model());
    let original = corpus.get("spells/fireball").unwrap();
    let restored = loaded.get("spells/fireball").unwrap();
    assert_eq!(restored.embedding, original.embedding);
    assert_eq!(restored.categories, original.categories);
    assert!(loaded.entity("Fireball").is_some());
}

#[test]
fn test_load_rejects_corrupt_blob() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.corpus.json");
    std::fs::write(&path, "{ not json").unwrap();

    let err = Corpus::load(&path).unwrap_err();
    assert!(matches!(err, lorekeeper::Error::CorpusLoad { .. }));
}

#[test]
fn test_load_rejects_dangling_parent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dangling.corpus.json");
    let blob = serde_json::json!({
        "documents": {
            "orphan": {
                "id": "orphan",
                "title": "Orphan",
                "content": "text",
                "parent_id": "missing"
            }
        },
        "entities": {},
        "embedding_model": "counting-3"
    });
    std::fs::write(&path, blob.to_string()).unwrap();

    assert!(Corpus::load(&path).is_err());
}

#[test]
fn test_neutral_request_is_pure_semantic() {
    let engine = engine(spell_corpus(), Arc::new(CountingEmbedder::new()));
    let plain = RetrievalRequest::new(Intent::SpellDetails, "cold hail", 10);
    let boosted = RetrievalRequest::new(Intent::SpellDetails, "cold hail", 10)
        .with_entities(vec!["Fireball".to_string()]);

    let (plain_results, _) = engine.query(&plain);
    let (boosted_results, _) = engine.query(&boosted);

    assert_eq!(plain_results[0].document_id, "spells/ice-storm");
    // the boost pulls fireball up relative to its plain score
    let plain_fireball = plain_results
        .iter()
        .find(|r| r.document_id == "spells/fireball")
        .unwrap();
    let boosted_fireball = boosted_results
        .iter()
        .find(|r| r.document_id == "spells/fireball")
        .unwrap();
    assert!(boosted_fireball.score > plain_fireball.score);
}
