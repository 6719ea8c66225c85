//! Shared fakes for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use climaterag::embedding::{EmbeddingProvider, SparseVector};
use climaterag::errors::{RagError, Result};
use climaterag::llm::{ChatMessage, ChatModel, CompletionParams};
use climaterag::rag::Reranker;
use climaterag::types::{Document, Filter, Payload};
use climaterag::vector_db::{Collection, InMemoryStore, Point, VectorStore};

pub const DIM: usize = 3;

/// Looks texts up in a table; unknown texts map to the first axis
#[derive(Default)]
pub struct TableEmbedder {
    vectors: HashMap<String, Vec<f32>>,
    pub calls: AtomicUsize,
}

impl TableEmbedder {
    pub fn new(entries: &[(&str, [f32; DIM])]) -> Self {
        Self {
            vectors: entries
                .iter()
                .map(|(text, v)| (text.to_string(), v.to_vec()))
                .collect(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for TableEmbedder {
    async fn dense_embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .vectors
            .get(text)
            .cloned()
            .unwrap_or_else(|| vec![1.0, 0.0, 0.0]))
    }

    async fn sparse_embed(&self, _text: &str) -> Result<SparseVector> {
        Ok(SparseVector::default())
    }

    fn dimension(&self) -> usize {
        DIM
    }
}

/// Scores each text from a table, defaulting to 0
pub struct TableReranker {
    scores: HashMap<String, f32>,
}

impl TableReranker {
    pub fn new(entries: &[(&str, f32)]) -> Self {
        Self {
            scores: entries.iter().map(|(t, s)| (t.to_string(), *s)).collect(),
        }
    }
}

#[async_trait]
impl Reranker for TableReranker {
    async fn score(&self, _query: &str, texts: &[String]) -> Result<Vec<f32>> {
        Ok(texts
            .iter()
            .map(|t| self.scores.get(t).copied().unwrap_or(0.0))
            .collect())
    }
}

/// Never answers within a test's patience
pub struct SlowReranker(pub Duration);

#[async_trait]
impl Reranker for SlowReranker {
    async fn score(&self, _query: &str, texts: &[String]) -> Result<Vec<f32>> {
        tokio::time::sleep(self.0).await;
        Ok(vec![0.0; texts.len()])
    }
}

/// Store whose searches always fail and are counted
#[derive(Default)]
pub struct UnreachableStore {
    pub searches: AtomicUsize,
}

#[async_trait]
impl VectorStore for UnreachableStore {
    async fn create_collection(&self, _name: &str, _dense_dim: u64) -> Result<()> {
        Ok(())
    }

    async fn collection_exists(&self, _name: &str) -> Result<bool> {
        Ok(true)
    }

    async fn upsert(&self, _collection: &str, _points: Vec<Point>) -> Result<()> {
        Ok(())
    }

    async fn similarity_search(
        &self,
        _collection: &str,
        _query: &str,
        _k: usize,
        _filter: Option<&Filter>,
    ) -> Result<Vec<Document>> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        Err(RagError::remote("UnreachableStore", "connection refused"))
    }

    async fn retrieve_payload(&self, _collection: &str, _id: &str) -> Result<Option<Payload>> {
        Ok(None)
    }
}

/// Replies with the prompt's first line, recording every prompt
#[derive(Default)]
pub struct RecordingModel {
    pub prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl ChatModel for RecordingModel {
    async fn complete(&self, messages: &[ChatMessage], _params: CompletionParams) -> Result<String> {
        let prompt = messages.last().map(|m| m.content.clone()).unwrap_or_default();
        let mut prompts = self.prompts.lock().unwrap();
        prompts.push(prompt);
        Ok(format!("answer {}", prompts.len()))
    }
}

pub fn policy_payload(country: &str, year: &str, policy: &str) -> Payload {
    Payload {
        country: Some(country.to_string()),
        year: Some(year.to_string()),
        policy: Some(policy.to_string()),
        effect: Some(String::new()),
        ..Payload::default()
    }
}

pub fn knowledge_payload(content: &str) -> Payload {
    Payload {
        content: Some(content.to_string()),
        ..Payload::default()
    }
}

pub fn point(id: &str, dense: [f32; DIM], payload: Payload) -> Point {
    Point {
        id: id.to_string(),
        payload,
        dense: dense.to_vec(),
        sparse: None,
    }
}

/// In-memory collection pre-filled with `points`
pub async fn collection_with(
    name: &str,
    embedder: Arc<dyn EmbeddingProvider>,
    points: Vec<Point>,
) -> Collection {
    let store: Arc<dyn VectorStore> = Arc::new(InMemoryStore::new(embedder));
    let collection = Collection::new(name, store);
    collection.recreate(DIM as u64).await.unwrap();
    collection.upsert(points).await.unwrap();
    collection
}
