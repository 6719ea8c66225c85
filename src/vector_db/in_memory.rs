// Brute-force in-process vector store
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::embedding::EmbeddingProvider;
use crate::errors::{RagError, Result};
use crate::rag::diversity::cosine_similarity;
use crate::types::{Document, Filter, Payload};
use crate::vector_db::{Point, VectorStore};

/// Vector store holding every point in memory and scoring by exact cosine.
///
/// Useful for offline runs over small corpora and as a test double for
/// `QdrantStore`.
pub struct InMemoryStore {
    embedder: Arc<dyn EmbeddingProvider>,
    collections: RwLock<HashMap<String, Vec<Point>>>,
}

impl InMemoryStore {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            embedder,
            collections: RwLock::new(HashMap::new()),
        }
    }

    /// Number of points in a collection (0 when it does not exist)
    pub async fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map_or(0, |points| points.len())
    }
}

#[async_trait]
impl VectorStore for InMemoryStore {
    async fn create_collection(&self, name: &str, _dense_dim: u64) -> Result<()> {
        let mut collections = self.collections.write().await;
        if collections.insert(name.to_string(), Vec::new()).is_some() {
            tracing::info!(collection = name, "replaced existing collection");
        }
        Ok(())
    }

    async fn collection_exists(&self, name: &str) -> Result<bool> {
        Ok(self.collections.read().await.contains_key(name))
    }

    async fn upsert(&self, collection: &str, points: Vec<Point>) -> Result<()> {
        let mut collections = self.collections.write().await;
        let stored = collections
            .get_mut(collection)
            .ok_or_else(|| RagError::remote("InMemoryStore", format!("no collection {}", collection)))?;

        for point in points {
            match stored.iter_mut().find(|p| p.id == point.id) {
                Some(existing) => *existing = point,
                None => stored.push(point),
            }
        }
        Ok(())
    }

    async fn similarity_search(
        &self,
        collection: &str,
        query: &str,
        k: usize,
        filter: Option<&Filter>,
    ) -> Result<Vec<Document>> {
        let query_vector = self.embedder.dense_embed(query).await?;

        let collections = self.collections.read().await;
        let stored = collections
            .get(collection)
            .ok_or_else(|| RagError::remote("InMemoryStore", format!("no collection {}", collection)))?;

        let mut hits: Vec<Document> = stored
            .iter()
            .filter(|p| filter.map_or(true, |f| f.matches(&p.payload)))
            .map(|p| Document {
                id: p.id.clone(),
                embedding: p.dense.clone(),
                payload: p.payload.clone(),
                score: cosine_similarity(&query_vector, &p.dense).unwrap_or(0.0),
            })
            .collect();

        // Stable sort keeps insertion order among equal scores
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(k);

        Ok(hits)
    }

    async fn retrieve_payload(&self, collection: &str, id: &str) -> Result<Option<Payload>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|points| points.iter().find(|p| p.id == id))
            .map(|p| p.payload.clone()))
    }
}
