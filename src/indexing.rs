//! Embedding and storing chunks, policies and knowledge in a collection
//!
//! Every record becomes one point carrying both its dense and sparse
//! vectors, with a fresh UUID v4 id and the record itself as payload.

use std::sync::Arc;
use uuid::Uuid;

use crate::embedding::EmbeddingProvider;
use crate::errors::Result;
use crate::ingest::{progress_bar, Chunk, PolicyRecord};
use crate::types::Payload;
use crate::vector_db::{Collection, Point, VectorStore};

pub struct Indexer {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl Indexer {
    pub fn new(store: Arc<dyn VectorStore>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { store, embedder }
    }

    /// Handle to an existing collection
    pub fn collection(&self, name: &str) -> Collection {
        Collection::new(name, self.store.clone())
    }

    /// Create `name` sized for the embedder, dropping any previous version
    pub async fn create_collection(&self, name: &str) -> Result<Collection> {
        let collection = self.collection(name);
        collection.recreate(self.embedder.dimension() as u64).await?;
        tracing::info!(collection = name, dim = self.embedder.dimension(), "collection initialized");
        Ok(collection)
    }

    /// Index raw chunks by their content
    pub async fn add_chunks(&self, collection: &Collection, chunks: &[Chunk]) -> Result<usize> {
        let mut items = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            items.push((chunk.content.clone(), Payload::from_json(serde_json::to_value(chunk)?)));
        }
        self.add(collection, items, "chunks").await
    }

    /// Index policy records by policy text followed by effect
    pub async fn add_policies(&self, collection: &Collection, policies: &[PolicyRecord]) -> Result<usize> {
        let mut items = Vec::with_capacity(policies.len());
        for policy in policies {
            let text = format!("{} {}", policy.policy, policy.effect);
            items.push((text, Payload::from_json(serde_json::to_value(policy)?)));
        }
        self.add(collection, items, "policies").await
    }

    /// Index knowledge chunks by their summary; chunks never summarized
    /// fall back to their content
    pub async fn add_knowledge(&self, collection: &Collection, chunks: &[Chunk]) -> Result<usize> {
        let mut items = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let text = chunk.summary.clone().unwrap_or_else(|| chunk.content.clone());
            let mut payload = Payload::from_json(serde_json::to_value(chunk)?);
            if payload.content.is_none() {
                payload.content = Some(text.clone());
            }
            items.push((text, payload));
        }
        self.add(collection, items, "knowledge").await
    }

    async fn add(&self, collection: &Collection, items: Vec<(String, Payload)>, label: &str) -> Result<usize> {
        let pb = progress_bar(items.len(), &format!("Embedding {}", label));
        let mut stored = 0;

        for (text, payload) in items {
            if text.trim().is_empty() {
                tracing::debug!(label, "skipping empty text");
                pb.inc(1);
                continue;
            }
            let point = Point {
                id: Uuid::new_v4().to_string(),
                dense: self.embedder.dense_embed(&text).await?,
                sparse: Some(self.embedder.sparse_embed(&text).await?),
                payload,
            };
            collection.upsert(vec![point]).await?;
            stored += 1;
            pb.inc(1);
        }

        pb.finish_and_clear();
        tracing::info!(collection = collection.name(), stored, label, "indexing complete");
        Ok(stored)
    }
}
