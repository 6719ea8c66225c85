//! Embedding providers
//!
//! Dense vectors drive similarity search and diversity filtering; sparse
//! term-weight vectors are stored alongside them for lexical matching.
//!
//! Components:
//! - `EmbeddingProvider`: the trait every backend implements
//! - `LocalEmbedder`: BERT sentence embeddings via candle
//! - `SparseEncoder`: term-frequency vectors over tokenizer ids
//! - `HybridEmbedder`: a dense provider paired with a sparse encoder

pub mod engine;
pub mod sparse;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::errors::Result;

pub use engine::LocalEmbedder;
pub use sparse::SparseEncoder;

/// High-dimensional, mostly-zero vector
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    pub indices: Vec<u32>,
    pub values: Vec<f32>,
}

impl SparseVector {
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Turns text into dense and sparse vectors
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Fixed-dimension dense vector
    async fn dense_embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Term-weight sparse vector
    async fn sparse_embed(&self, text: &str) -> Result<SparseVector>;

    /// Dimension of `dense_embed` output
    fn dimension(&self) -> usize;
}

/// Dense embedding source without a sparse half
#[async_trait]
pub trait DenseEmbedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
    fn dimension(&self) -> usize;
}

/// Combines any dense embedder with the tokenizer-based sparse encoder
pub struct HybridEmbedder {
    dense: Arc<dyn DenseEmbedder>,
    sparse: SparseEncoder,
}

impl HybridEmbedder {
    pub fn new(dense: Arc<dyn DenseEmbedder>, sparse: SparseEncoder) -> Self {
        Self { dense, sparse }
    }
}

#[async_trait]
impl EmbeddingProvider for HybridEmbedder {
    async fn dense_embed(&self, text: &str) -> Result<Vec<f32>> {
        self.dense.embed(text).await
    }

    async fn sparse_embed(&self, text: &str) -> Result<SparseVector> {
        self.sparse.encode(text)
    }

    fn dimension(&self) -> usize {
        self.dense.dimension()
    }
}
