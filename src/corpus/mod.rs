//! The offline-built document corpus.
//!
//! A corpus is an arena of [`Document`]s indexed by id, plus the entity table
//! and the identifier of the embedding model used to build it. It is
//! persisted as a single JSON blob and is read-only at query time; the only
//! structure mutated during query execution is the embedding cache.

mod builder;

pub use builder::CorpusBuilder;

use crate::models::{Document, Entity};
use crate::taxonomy::Category;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Recursion bound for excerpt assembly, beyond the visited-set guard.
const MAX_EXCERPT_DEPTH: usize = 32;

/// The full offline-built set of documents and entities searched at query time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Corpus {
    pub(crate) documents: HashMap<String, Document>,
    pub(crate) entities: HashMap<String, Entity>,
    pub(crate) embedding_model: String,
}

impl Corpus {
    /// Loads a corpus from a persisted JSON blob and validates it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CorpusLoad`] if the file is missing, unreadable,
    /// corrupt, or violates the forest property. Load failure is fatal at
    /// engine construction; it is never masked.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| Error::CorpusLoad {
            path: path.display().to_string(),
            cause: e.to_string(),
        })?;

        let corpus: Self = serde_json::from_str(&contents).map_err(|e| Error::CorpusLoad {
            path: path.display().to_string(),
            cause: e.to_string(),
        })?;

        corpus.validate().map_err(|e| Error::CorpusLoad {
            path: path.display().to_string(),
            cause: e.to_string(),
        })?;

        tracing::info!(
            path = %path.display(),
            documents = corpus.documents.len(),
            entities = corpus.entities.len(),
            embedding_model = %corpus.embedding_model,
            "corpus loaded"
        );
        Ok(corpus)
    }

    /// Saves the corpus as a JSON blob.
    ///
    /// The round-trip through [`Self::load`] is lossless, including exact
    /// embedding vector values.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let contents = serde_json::to_string(self).map_err(|e| Error::OperationFailed {
            operation: "serialize_corpus".to_string(),
            cause: e.to_string(),
        })?;
        std::fs::write(path, contents).map_err(|e| Error::OperationFailed {
            operation: "write_corpus".to_string(),
            cause: e.to_string(),
        })?;
        tracing::info!(path = %path.display(), documents = self.documents.len(), "corpus saved");
        Ok(())
    }

    /// Returns the document with the given id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Document> {
        self.documents.get(id)
    }

    /// Returns the entity with the given name.
    #[must_use]
    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.entities.get(name)
    }

    /// Iterates over all documents (arbitrary order).
    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.documents.values()
    }

    /// Iterates over all entities (arbitrary order).
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Number of documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Returns true if the corpus has no documents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// The embedding model identifier the corpus was built with.
    #[must_use]
    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    /// Checks structural invariants: every hierarchy reference resolves,
    /// parent/child links agree, and the parent relation is acyclic (the
    /// documents form a forest).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] naming the first violation found.
    pub fn validate(&self) -> Result<()> {
        for doc in self.documents.values() {
            if let Some(parent_id) = &doc.parent_id {
                let parent = self.documents.get(parent_id).ok_or_else(|| {
                    Error::InvalidInput(format!(
                        "document '{}' references missing parent '{parent_id}'",
                        doc.id
                    ))
                })?;
                if !parent.children_ids.contains(&doc.id) {
                    return Err(Error::InvalidInput(format!(
                        "document '{}' claims parent '{parent_id}' but is not among its children",
                        doc.id
                    )));
                }
            }

            let mut seen_children = HashSet::new();
            for child_id in &doc.children_ids {
                if !seen_children.insert(child_id.as_str()) {
                    return Err(Error::InvalidInput(format!(
                        "document '{}' lists child '{child_id}' more than once",
                        doc.id
                    )));
                }
                let child = self.documents.get(child_id).ok_or_else(|| {
                    Error::InvalidInput(format!(
                        "document '{}' references missing child '{child_id}'",
                        doc.id
                    ))
                })?;
                if child.parent_id.as_deref() != Some(doc.id.as_str()) {
                    return Err(Error::InvalidInput(format!(
                        "document '{child_id}' is listed as a child of '{}' but its parent is {:?}",
                        doc.id, child.parent_id
                    )));
                }
            }
        }

        // Acyclicity: following parent links from any document must terminate.
        for doc in self.documents.values() {
            let mut visited = HashSet::new();
            let mut current = doc;
            while let Some(parent_id) = &current.parent_id {
                if !visited.insert(current.id.as_str()) {
                    return Err(Error::InvalidInput(format!(
                        "cycle in parent chain involving document '{}'",
                        current.id
                    )));
                }
                match self.documents.get(parent_id) {
                    Some(parent) => current = parent,
                    None => break, // already reported above; be defensive here
                }
            }
        }

        Ok(())
    }

    /// Returns the effective category set for a document.
    ///
    /// A document with an explicit (non-empty) assignment uses it and never
    /// inherits. A document with an empty assignment inherits from the
    /// nearest categorized ancestor; with no such ancestor the set is empty.
    #[must_use]
    pub fn effective_categories(&self, id: &str) -> &[Category] {
        let mut visited = HashSet::new();
        let mut current = self.documents.get(id);
        while let Some(doc) = current {
            if doc.has_explicit_categories() {
                return &doc.categories;
            }
            if !visited.insert(doc.id.as_str()) {
                break; // malformed parent chain; treat as uncategorized
            }
            current = doc.parent_id.as_deref().and_then(|p| self.documents.get(p));
        }
        &[]
    }

    /// Assembles a self-contained hierarchical excerpt for a document.
    ///
    /// The document's content is followed by the content of its descendants
    /// in parent-declared order, each introduced by its title. Recursion is
    /// guarded by a visited set and a depth bound so malformed back-references
    /// cannot recurse unboundedly.
    ///
    /// Returns the excerpt and whether any descendant content was included.
    #[must_use]
    pub fn assemble_excerpt(&self, id: &str) -> Option<(String, bool)> {
        let doc = self.documents.get(id)?;
        let mut out = doc.content.clone();
        let mut visited = HashSet::new();
        visited.insert(doc.id.as_str());
        let mut included = false;
        for child_id in &doc.children_ids {
            self.append_descendants(child_id, &mut out, &mut visited, 1, &mut included);
        }
        Some((out, included))
    }

    fn append_descendants<'a>(
        &'a self,
        id: &str,
        out: &mut String,
        visited: &mut HashSet<&'a str>,
        depth: usize,
        included: &mut bool,
    ) {
        if depth > MAX_EXCERPT_DEPTH {
            return;
        }
        let Some(doc) = self.documents.get(id) else {
            return;
        };
        if !visited.insert(doc.id.as_str()) {
            return;
        }
        out.push_str("\n\n");
        out.push_str(&doc.title);
        out.push('\n');
        out.push_str(&doc.content);
        *included = true;
        for child_id in &doc.children_ids {
            self.append_descendants(child_id, out, visited, depth + 1, included);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linked(parent: &str, child: Document) -> Document {
        child.with_parent(parent)
    }

    fn three_level_corpus() -> Corpus {
        let mut builder = CorpusBuilder::new("test-model");
        builder
            .push_document(
                Document::new("spells", "Spells", "Spellcasting overview.")
                    .with_categories(vec![Category::Spellcasting]),
            )
            .unwrap();
        builder
            .push_document(
                linked("spells", Document::new("spells/evocation", "Evocation", "Evocation spells."))
                    .with_level(2),
            )
            .unwrap();
        builder
            .push_document(
                linked(
                    "spells/evocation",
                    Document::new("spells/evocation/fireball", "Fireball", "A bright streak."),
                )
                .with_level(3),
            )
            .unwrap();
        builder.into_corpus_unembedded().unwrap()
    }

    #[test]
    fn test_validate_accepts_forest() {
        let corpus = three_level_corpus();
        assert!(corpus.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_parent() {
        let mut corpus = three_level_corpus();
        if let Some(doc) = corpus.documents.get_mut("spells/evocation") {
            doc.parent_id = Some("nowhere".to_string());
        }
        assert!(corpus.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_cycle() {
        let mut corpus = three_level_corpus();
        // spells -> spells/evocation/fireball closes a parent cycle
        if let Some(doc) = corpus.documents.get_mut("spells") {
            doc.parent_id = Some("spells/evocation/fireball".to_string());
        }
        if let Some(doc) = corpus.documents.get_mut("spells/evocation/fireball") {
            doc.children_ids.push("spells".to_string());
        }
        assert!(corpus.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_child_claimed_by_two_parents() {
        let mut corpus = three_level_corpus();
        if let Some(doc) = corpus.documents.get_mut("spells/evocation/fireball") {
            doc.children_ids.push("spells/evocation".to_string());
        }
        assert!(corpus.validate().is_err());
    }

    #[test]
    fn test_effective_categories_inherit() {
        let corpus = three_level_corpus();
        // fireball has no explicit assignment, inherits from "spells"
        assert_eq!(
            corpus.effective_categories("spells/evocation/fireball"),
            &[Category::Spellcasting]
        );
    }

    #[test]
    fn test_effective_categories_explicit_never_inherits() {
        let mut corpus = three_level_corpus();
        if let Some(doc) = corpus.documents.get_mut("spells/evocation") {
            doc.categories = vec![Category::Combat];
        }
        assert_eq!(
            corpus.effective_categories("spells/evocation"),
            &[Category::Combat]
        );
        // and the grandchild now inherits the nearest ancestor, not the root
        assert_eq!(
            corpus.effective_categories("spells/evocation/fireball"),
            &[Category::Combat]
        );
    }

    #[test]
    fn test_effective_categories_uncategorized() {
        let mut builder = CorpusBuilder::new("test-model");
        builder
            .push_document(Document::new("loose", "Loose", "No category anywhere."))
            .unwrap();
        let corpus = builder.into_corpus_unembedded().unwrap();
        assert!(corpus.effective_categories("loose").is_empty());
    }

    #[test]
    fn test_assemble_excerpt_includes_descendants() {
        let corpus = three_level_corpus();
        let (excerpt, included) = corpus.assemble_excerpt("spells").unwrap();
        assert!(included);
        assert!(excerpt.contains("Spellcasting overview."));
        assert!(excerpt.contains("Evocation"));
        assert!(excerpt.contains("A bright streak."));
    }

    #[test]
    fn test_assemble_excerpt_leaf() {
        let corpus = three_level_corpus();
        let (excerpt, included) = corpus.assemble_excerpt("spells/evocation/fireball").unwrap();
        assert!(!included);
        assert_eq!(excerpt, "A bright streak.");
    }

    #[test]
    fn test_assemble_excerpt_guards_against_cycle() {
        let mut corpus = three_level_corpus();
        // forge a malformed back-reference without validating
        if let Some(doc) = corpus.documents.get_mut("spells/evocation/fireball") {
            doc.children_ids.push("spells".to_string());
        }
        // must terminate and include each document at most once
        let (excerpt, _) = corpus.assemble_excerpt("spells").unwrap();
        assert_eq!(excerpt.matches("Spellcasting overview.").count(), 1);
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.json");

        let mut corpus = three_level_corpus();
        if let Some(doc) = corpus.documents.get_mut("spells/evocation/fireball") {
            doc.embedding = Some(vec![0.123_456_79_f32, -0.987_654_3_f32, 1.5e-7_f32]);
        }
        corpus.save(&path).unwrap();

        let loaded = Corpus::load(&path).unwrap();
        assert_eq!(loaded.len(), corpus.len());
        assert_eq!(
            loaded.get("spells/evocation/fireball").unwrap().embedding,
            corpus.get("spells/evocation/fireball").unwrap().embedding,
        );
        assert_eq!(loaded.embedding_model(), "test-model");
    }

    #[test]
    fn test_load_missing_file_is_fatal() {
        let err = Corpus::load("/nonexistent/corpus.json").unwrap_err();
        assert!(matches!(err, Error::CorpusLoad { .. }));
    }

    #[test]
    fn test_load_corrupt_blob_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = Corpus::load(&path).unwrap_err();
        assert!(matches!(err, Error::CorpusLoad { .. }));
    }
}
