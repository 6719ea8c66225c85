//! Vector stores
//!
//! The store persists points (dense + sparse vectors with a payload) and
//! answers similarity queries with optional structured filters. It is
//! always reached through the `VectorStore` trait so retrievers can be
//! pointed at Qdrant in production and at `InMemoryStore` in tests.

pub mod in_memory;
pub mod qdrant;

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use crate::embedding::SparseVector;
use crate::errors::Result;
use crate::types::{Document, Filter, Payload};

pub use in_memory::InMemoryStore;
pub use qdrant::QdrantStore;

/// A point to upsert
#[derive(Debug, Clone)]
pub struct Point {
    pub id: String,
    pub payload: Payload,
    pub dense: Vec<f32>,
    pub sparse: Option<SparseVector>,
}

/// Storage and similarity search over named collections
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create a collection, replacing any existing one with the same name
    async fn create_collection(&self, name: &str, dense_dim: u64) -> Result<()>;

    async fn collection_exists(&self, name: &str) -> Result<bool>;

    async fn upsert(&self, collection: &str, points: Vec<Point>) -> Result<()>;

    /// The `k` nearest documents to `query`, vectors included, best first.
    /// Only documents satisfying `filter` are eligible.
    async fn similarity_search(
        &self,
        collection: &str,
        query: &str,
        k: usize,
        filter: Option<&Filter>,
    ) -> Result<Vec<Document>>;

    /// Payload of one stored point; `None` when the id is unknown
    async fn retrieve_payload(&self, collection: &str, id: &str) -> Result<Option<Payload>>;
}

/// Handle to one collection in a store
#[derive(Clone)]
pub struct Collection {
    name: String,
    store: Arc<dyn VectorStore>,
}

impl Collection {
    pub fn new(name: impl Into<String>, store: Arc<dyn VectorStore>) -> Self {
        Self {
            name: name.into(),
            store,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn similarity_search(
        &self,
        query: &str,
        k: usize,
        filter: Option<&Filter>,
    ) -> Result<Vec<Document>> {
        self.store.similarity_search(&self.name, query, k, filter).await
    }

    pub async fn retrieve_payload(&self, id: &str) -> Result<Option<Payload>> {
        self.store.retrieve_payload(&self.name, id).await
    }

    pub async fn upsert(&self, points: Vec<Point>) -> Result<()> {
        self.store.upsert(&self.name, points).await
    }

    pub async fn recreate(&self, dense_dim: u64) -> Result<()> {
        self.store.create_collection(&self.name, dense_dim).await
    }

    pub async fn exists(&self) -> Result<bool> {
        self.store.collection_exists(&self.name).await
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection").field("name", &self.name).finish()
    }
}
