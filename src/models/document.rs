//! Corpus documents and extracted entities.

use crate::taxonomy::Category;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A node in the hierarchical document corpus (e.g., a rulebook section).
///
/// Documents are created once by the offline corpus build and are immutable
/// at query time. The parent/children relation must form a forest: no cycles,
/// at most one parent per document. The parent owns the ordering of
/// `children_ids`; it does not own the children's lifetime (all documents
/// live in the corpus arena, keyed by id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Unique identifier within the corpus.
    pub id: String,
    /// Section title.
    pub title: String,
    /// Hierarchy depth, 1 = root.
    #[serde(default = "default_level")]
    pub level: u32,
    /// Raw section text.
    pub content: String,
    /// Weak back-reference to the parent section, if any.
    #[serde(default)]
    pub parent_id: Option<String>,
    /// Ordered child section ids.
    #[serde(default)]
    pub children_ids: Vec<String>,
    /// Explicit category assignment. Empty means "inherit from the nearest
    /// categorized ancestor" (see `Corpus::effective_categories`).
    #[serde(default)]
    pub categories: Vec<Category>,
    /// Precomputed embedding vector. Documents without one are skipped by
    /// semantic scoring, not scored as zero.
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
    /// Free-form metadata (source book, page, build provenance).
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

const fn default_level() -> u32 {
    1
}

impl Document {
    /// Creates a new root-level document with no hierarchy links.
    #[must_use]
    pub fn new(id: impl Into<String>, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            level: 1,
            content: content.into(),
            parent_id: None,
            children_ids: Vec::new(),
            categories: Vec::new(),
            embedding: None,
            metadata: HashMap::new(),
        }
    }

    /// Sets the hierarchy level.
    #[must_use]
    pub const fn with_level(mut self, level: u32) -> Self {
        self.level = level;
        self
    }

    /// Sets the parent id.
    #[must_use]
    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Sets the explicit category assignment.
    #[must_use]
    pub fn with_categories(mut self, categories: Vec<Category>) -> Self {
        self.categories = categories;
        self
    }

    /// Sets the embedding vector.
    #[must_use]
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Returns true if the document has an explicit category assignment.
    #[must_use]
    pub fn has_explicit_categories(&self) -> bool {
        !self.categories.is_empty()
    }
}

/// A named domain concept (spell, item, NPC) extracted from the corpus.
///
/// Built offline alongside the documents; read-only at query time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Canonical name.
    pub name: String,
    /// Type tag ("spell", "item", "npc", ...).
    pub entity_type: String,
    /// Alternative names.
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Documents that mention this entity.
    #[serde(default)]
    pub document_ids: Vec<String>,
}

impl Entity {
    /// Creates a new entity.
    #[must_use]
    pub fn new(name: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entity_type: entity_type.into(),
            aliases: Vec::new(),
            document_ids: Vec::new(),
        }
    }

    /// Adds an alias.
    #[must_use]
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Adds a mentioning document.
    #[must_use]
    pub fn with_document(mut self, document_id: impl Into<String>) -> Self {
        self.document_ids.push(document_id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_builder() {
        let doc = Document::new("spells/fireball", "Fireball", "A bright streak...")
            .with_level(3)
            .with_parent("spells")
            .with_categories(vec![Category::Spellcasting])
            .with_metadata("book", "core");

        assert_eq!(doc.id, "spells/fireball");
        assert_eq!(doc.level, 3);
        assert_eq!(doc.parent_id.as_deref(), Some("spells"));
        assert!(doc.has_explicit_categories());
        assert_eq!(doc.metadata.get("book").map(String::as_str), Some("core"));
    }

    #[test]
    fn test_document_empty_categories_mean_inherit() {
        let doc = Document::new("a", "A", "text");
        assert!(!doc.has_explicit_categories());
    }

    #[test]
    fn test_document_serde_roundtrip() {
        let doc = Document::new("a", "A", "text").with_embedding(vec![0.25, -0.5, 1.0]);
        let json = serde_json::to_string(&doc).unwrap();
        let back: Document = serde_json::from_str(&json).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn test_entity_builder() {
        let entity = Entity::new("Fireball", "spell")
            .with_alias("fire ball")
            .with_document("spells/fireball");

        assert_eq!(entity.name, "Fireball");
        assert_eq!(entity.aliases, vec!["fire ball"]);
        assert_eq!(entity.document_ids, vec!["spells/fireball"]);
    }
}
