//! Offline corpus construction.
//!
//! The builder collects documents and entities, derives the parent→children
//! links in insertion order, embeds document contents through an
//! [`Embedder`], and emits a validated [`Corpus`]. This runs offline, once,
//! when the corpus is built; query-time code never constructs documents.

use super::Corpus;
use crate::embedding::Embedder;
use crate::models::{Document, Entity};
use crate::{Error, Result};
use std::collections::HashMap;

/// Builder for an offline corpus.
pub struct CorpusBuilder {
    documents: Vec<Document>,
    entities: HashMap<String, Entity>,
    embedding_model: String,
}

impl CorpusBuilder {
    /// Creates a builder tagged with the embedding model identifier.
    #[must_use]
    pub fn new(embedding_model: impl Into<String>) -> Self {
        Self {
            documents: Vec::new(),
            entities: HashMap::new(),
            embedding_model: embedding_model.into(),
        }
    }

    /// Adds a document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] on a duplicate id.
    pub fn push_document(&mut self, document: Document) -> Result<()> {
        if self.documents.iter().any(|d| d.id == document.id) {
            return Err(Error::InvalidInput(format!(
                "duplicate document id '{}'",
                document.id
            )));
        }
        self.documents.push(document);
        Ok(())
    }

    /// Adds an entity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] on a duplicate name.
    pub fn push_entity(&mut self, entity: Entity) -> Result<()> {
        if self.entities.contains_key(&entity.name) {
            return Err(Error::InvalidInput(format!(
                "duplicate entity '{}'",
                entity.name
            )));
        }
        self.entities.insert(entity.name.clone(), entity);
        Ok(())
    }

    /// Builds the corpus, embedding every document that lacks a vector.
    ///
    /// Embedding text is `title` and `content` joined by a blank line. The
    /// build step is offline, so provider failures propagate instead of
    /// degrading; rerun the build after fixing the provider.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding fails or the document set violates the
    /// forest property.
    pub fn build(mut self, embedder: &dyn Embedder) -> Result<Corpus> {
        let pending: Vec<usize> = self
            .documents
            .iter()
            .enumerate()
            .filter(|(_, d)| d.embedding.is_none())
            .map(|(i, _)| i)
            .collect();

        if !pending.is_empty() {
            let texts: Vec<String> = pending
                .iter()
                .map(|&i| {
                    let doc = &self.documents[i];
                    format!("{}\n\n{}", doc.title, doc.content)
                })
                .collect();
            let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
            let vectors = embedder.embed_batch(&refs)?;
            if vectors.len() != pending.len() {
                return Err(Error::OperationFailed {
                    operation: "embed_corpus".to_string(),
                    cause: format!(
                        "provider returned {} vectors for {} texts",
                        vectors.len(),
                        pending.len()
                    ),
                });
            }
            for (&i, vector) in pending.iter().zip(vectors) {
                self.documents[i].embedding = Some(vector);
            }
            tracing::info!(embedded = pending.len(), "embedded corpus documents");
        }

        self.into_corpus_unembedded()
    }

    /// Builds the corpus without embedding anything.
    ///
    /// Used when documents already carry vectors, and by tests that score
    /// with stub embeddings.
    ///
    /// # Errors
    ///
    /// Returns an error if the document set violates the forest property.
    pub fn into_corpus_unembedded(self) -> Result<Corpus> {
        let mut documents: HashMap<String, Document> = self
            .documents
            .iter()
            .map(|d| (d.id.clone(), d.clone()))
            .collect();

        // Derive parent→children links in insertion order; the parent owns
        // the ordering. Pre-set links are kept, not duplicated.
        for doc in &self.documents {
            if let Some(parent_id) = &doc.parent_id {
                let parent = documents.get_mut(parent_id).ok_or_else(|| {
                    Error::InvalidInput(format!(
                        "document '{}' references missing parent '{parent_id}'",
                        doc.id
                    ))
                })?;
                if !parent.children_ids.contains(&doc.id) {
                    parent.children_ids.push(doc.id.clone());
                }
            }
        }

        let corpus = Corpus {
            documents,
            entities: self.entities,
            embedding_model: self.embedding_model,
        };
        corpus.validate()?;
        Ok(corpus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbedder;

    #[test]
    fn test_duplicate_document_rejected() {
        let mut builder = CorpusBuilder::new("m");
        builder.push_document(Document::new("a", "A", "x")).unwrap();
        assert!(builder.push_document(Document::new("a", "A2", "y")).is_err());
    }

    #[test]
    fn test_duplicate_entity_rejected() {
        let mut builder = CorpusBuilder::new("m");
        builder.push_entity(Entity::new("Fireball", "spell")).unwrap();
        assert!(builder.push_entity(Entity::new("Fireball", "spell")).is_err());
    }

    #[test]
    fn test_children_derived_in_insertion_order() {
        let mut builder = CorpusBuilder::new("m");
        builder.push_document(Document::new("root", "Root", "r")).unwrap();
        builder
            .push_document(Document::new("b", "B", "b").with_parent("root"))
            .unwrap();
        builder
            .push_document(Document::new("a", "A", "a").with_parent("root"))
            .unwrap();
        let corpus = builder.into_corpus_unembedded().unwrap();
        assert_eq!(corpus.get("root").unwrap().children_ids, vec!["b", "a"]);
    }

    #[test]
    fn test_build_embeds_missing_vectors() {
        let embedder = HashEmbedder::new(16);
        let mut builder = CorpusBuilder::new("hash-16");
        builder.push_document(Document::new("a", "A", "alpha")).unwrap();
        builder
            .push_document(Document::new("b", "B", "beta").with_embedding(vec![0.0; 16]))
            .unwrap();
        let corpus = builder.build(&embedder).unwrap();
        assert!(corpus.get("a").unwrap().embedding.is_some());
        assert_eq!(corpus.get("b").unwrap().embedding, Some(vec![0.0; 16]));
    }

    #[test]
    fn test_missing_parent_fails_build() {
        let mut builder = CorpusBuilder::new("m");
        builder
            .push_document(Document::new("orphan", "O", "o").with_parent("ghost"))
            .unwrap();
        assert!(builder.into_corpus_unembedded().is_err());
    }
}
