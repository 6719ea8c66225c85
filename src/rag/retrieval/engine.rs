// Retriever: one retrieval request from search to diversity-filtered contents
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::embedding::EmbeddingProvider;
use crate::errors::{RagError, Result};
use crate::rag::diversity::FilteredResultSet;
use crate::rag::reranking::{rank_by_scores, RankedDocument, Reranker};
use crate::types::{Document, Filter};
use crate::vector_db::Collection;

/// Budget for each remote call made by a retriever
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Executes a single retrieval request.
///
/// Steps run in the order the caller invokes them:
/// `similarity_search[_with_filter]` → `rerank` → `cosine_filter`.
/// Every remote call is awaited before the next one starts, and each is
/// bounded by the call timeout. A new search clears the results of the
/// later steps.
pub struct Retriever {
    query: String,
    collection: Collection,
    embedder: Arc<dyn EmbeddingProvider>,
    reranker: Option<Arc<dyn Reranker>>,
    call_timeout: Duration,
    found_docs: Vec<Document>,
    reranked_docs: Option<Vec<RankedDocument>>,
    filtered: FilteredResultSet,
}

impl Retriever {
    pub fn new(
        query: impl Into<String>,
        collection: Collection,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        Self {
            query: query.into(),
            collection,
            embedder,
            reranker: None,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            found_docs: Vec::new(),
            reranked_docs: None,
            filtered: FilteredResultSet::default(),
        }
    }

    pub fn with_reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    pub fn with_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    /// The k nearest documents, no filter
    pub async fn similarity_search(&mut self, k: usize) -> Result<&[Document]> {
        self.search(k, None).await
    }

    /// The k nearest documents satisfying `filter`.
    ///
    /// A filter with an empty membership set matches nothing, so the store
    /// is not consulted.
    pub async fn similarity_search_with_filter(
        &mut self,
        k: usize,
        filter: &Filter,
    ) -> Result<&[Document]> {
        if filter.is_unsatisfiable() {
            tracing::debug!(collection = self.collection.name(), "filter matches no documents");
            self.reset(Vec::new());
            return Ok(&self.found_docs);
        }
        self.search(k, Some(filter)).await
    }

    async fn search(&mut self, k: usize, filter: Option<&Filter>) -> Result<&[Document]> {
        let docs = self
            .timed(
                "vector search",
                self.collection.similarity_search(&self.query, k, filter),
            )
            .await?;

        tracing::debug!(
            collection = self.collection.name(),
            k,
            found = docs.len(),
            filtered = filter.is_some(),
            "similarity search"
        );
        self.reset(docs);
        Ok(&self.found_docs)
    }

    fn reset(&mut self, docs: Vec<Document>) {
        self.found_docs = docs;
        self.reranked_docs = None;
        self.filtered = FilteredResultSet::default();
    }

    /// Reorder the found documents by cross-encoder relevance.
    ///
    /// The scored text of each document is the concatenation of the named
    /// payload attributes. Equal scores keep retrieval order.
    pub async fn rerank<S: AsRef<str> + Sync>(
        &mut self,
        attributes: &[S],
    ) -> Result<&[RankedDocument]> {
        let reranker = self
            .reranker
            .clone()
            .ok_or(RagError::MissingCollaborator("reranker"))?;

        let mut texts = Vec::with_capacity(self.found_docs.len());
        for doc in &self.found_docs {
            texts.push(self.attribute_text(doc, attributes).await?);
        }

        let scores = self
            .timed("rerank", reranker.score(&self.query, &texts))
            .await?;
        let ranked = rank_by_scores(self.found_docs.clone(), scores)?;

        tracing::debug!(documents = ranked.len(), "reranked");
        self.filtered = FilteredResultSet::default();
        Ok(self.reranked_docs.insert(ranked).as_slice())
    }

    /// Greedily keep candidates whose embedding stays within `threshold`
    /// cosine similarity of every candidate kept so far, up to `k`.
    ///
    /// Candidates are the reranked documents when `rerank` ran, otherwise the
    /// found documents in store order. Candidates with no text for the named
    /// attributes are skipped and never take a slot.
    pub async fn cosine_filter<S: AsRef<str> + Sync>(
        &mut self,
        attributes: &[S],
        threshold: f32,
        k: usize,
    ) -> Result<&[String]> {
        let mut filtered = FilteredResultSet::new(threshold, k);

        for doc in self.candidates() {
            if filtered.is_full() {
                break;
            }
            let content = self.attribute_text(doc, attributes).await?;
            if content.is_empty() {
                tracing::trace!(id = %doc.id, "skipped candidate without text");
                continue;
            }
            let embedding = self
                .timed("embedding", self.embedder.dense_embed(&content))
                .await?;
            if !filtered.offer(embedding, content) {
                tracing::trace!(id = %doc.id, "rejected near-duplicate");
            }
        }

        tracing::debug!(kept = filtered.len(), threshold, k, "diversity filter");
        self.filtered = filtered;
        Ok(self.filtered.contents())
    }

    /// Attribute texts of the current candidates, in candidate order
    pub async fn candidate_texts<S: AsRef<str> + Sync>(
        &self,
        attributes: &[S],
    ) -> Result<Vec<String>> {
        let mut texts = Vec::new();
        for doc in self.candidates() {
            texts.push(self.attribute_text(doc, attributes).await?);
        }
        Ok(texts)
    }

    fn candidates(&self) -> Box<dyn Iterator<Item = &Document> + Send + '_> {
        match &self.reranked_docs {
            Some(ranked) => Box::new(ranked.iter().map(|r| &r.document)),
            None => Box::new(self.found_docs.iter()),
        }
    }

    /// Concatenated attribute text; fetches the payload when the store
    /// returned the document without one. Missing attributes read as "".
    async fn attribute_text<S: AsRef<str> + Sync>(
        &self,
        doc: &Document,
        attributes: &[S],
    ) -> Result<String> {
        if !doc.payload.is_empty() {
            return Ok(doc.payload.text_of(attributes));
        }

        let payload = self
            .timed("payload lookup", self.collection.retrieve_payload(&doc.id))
            .await?
            .unwrap_or_default();
        Ok(payload.text_of(attributes))
    }

    async fn timed<T, F>(&self, operation: &str, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.call_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(RagError::Timeout {
                operation: operation.to_string(),
                duration_ms: self.call_timeout.as_millis() as u64,
            }),
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn found_docs(&self) -> &[Document] {
        &self.found_docs
    }

    /// Empty until `rerank` has run
    pub fn reranked_docs(&self) -> &[RankedDocument] {
        self.reranked_docs.as_deref().unwrap_or(&[])
    }

    pub fn is_reranked(&self) -> bool {
        self.reranked_docs.is_some()
    }

    pub fn filtered_contents(&self) -> &[String] {
        self.filtered.contents()
    }

    pub fn filtered_embeddings(&self) -> &[Vec<f32>] {
        self.filtered.embeddings()
    }
}
