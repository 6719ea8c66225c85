// Context assemblers: configure a Retriever per retrieval pattern and
// concatenate its results for prompt injection
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::config::RetrievalSettings;
use crate::embedding::EmbeddingProvider;
use crate::errors::Result;
use crate::rag::reranking::Reranker;
use crate::rag::retrieval::Retriever;
use crate::types::country_policy_filter;
use crate::vector_db::Collection;

/// Payload attributes that make up a policy record's text
pub const POLICY_ATTRIBUTES: [&str; 2] = ["policy", "effect"];
/// Payload attribute holding a knowledge chunk's text
pub const KNOWLEDGE_ATTRIBUTES: [&str; 1] = ["content"];

/// Ordered contents selected for a prompt.
///
/// An empty context is a valid result, not an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievedContext {
    pub contents: Vec<String>,
}

impl RetrievedContext {
    /// Contents joined by single spaces, in retrieval order
    pub fn text(&self) -> String {
        self.contents.join(" ")
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    pub fn len(&self) -> usize {
        self.contents.len()
    }

    /// Text, or `marker` when nothing was retrieved
    pub fn text_or(&self, marker: &str) -> String {
        if self.is_empty() {
            marker.to_string()
        } else {
            self.text()
        }
    }
}

impl fmt::Display for RetrievedContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

/// Builds retrievers for the two lookup patterns.
///
/// Reranking and diversity filtering follow `RetrievalSettings`; both are
/// off by default, in which case contents come from the store's ranking.
#[derive(Clone)]
pub struct ContextAssembler {
    embedder: Arc<dyn EmbeddingProvider>,
    reranker: Option<Arc<dyn Reranker>>,
    settings: RetrievalSettings,
}

impl ContextAssembler {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, settings: RetrievalSettings) -> Self {
        Self {
            embedder,
            reranker: None,
            settings,
        }
    }

    pub fn with_reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    pub fn settings(&self) -> &RetrievalSettings {
        &self.settings
    }

    fn retriever(&self, query: &str, collection: &Collection) -> Retriever {
        let retriever = Retriever::new(query, collection.clone(), self.embedder.clone())
            .with_timeout(Duration::from_secs(self.settings.call_timeout_secs));
        match &self.reranker {
            Some(reranker) => retriever.with_reranker(reranker.clone()),
            None => retriever,
        }
    }

    /// Policies of `country` dated `year_threshold` or later that match `query`
    pub async fn retrieve_country_policies(
        &self,
        country: &str,
        query: &str,
        collection: &Collection,
        year_threshold: i32,
        k: usize,
    ) -> Result<RetrievedContext> {
        let filter = country_policy_filter(country, year_threshold, self.settings.year_upper_bound);

        let mut retriever = self.retriever(query, collection);
        retriever.similarity_search_with_filter(k, &filter).await?;
        let context = self.finish(&mut retriever, &POLICY_ATTRIBUTES).await?;

        tracing::info!(country, year_threshold, items = context.len(), "retrieved country policies");
        Ok(context)
    }

    /// Knowledge-base chunks that match `query`
    pub async fn retrieve_knowledge(
        &self,
        query: &str,
        collection: &Collection,
        k: usize,
    ) -> Result<RetrievedContext> {
        let context = self.retrieve_unfiltered(query, collection, &KNOWLEDGE_ATTRIBUTES, k).await?;
        tracing::info!(items = context.len(), "retrieved knowledge");
        Ok(context)
    }

    /// Policies of any country or year that match `query`
    pub async fn retrieve_policies(
        &self,
        query: &str,
        collection: &Collection,
        k: usize,
    ) -> Result<RetrievedContext> {
        let context = self.retrieve_unfiltered(query, collection, &POLICY_ATTRIBUTES, k).await?;
        tracing::info!(items = context.len(), "retrieved policies");
        Ok(context)
    }

    async fn retrieve_unfiltered(
        &self,
        query: &str,
        collection: &Collection,
        attributes: &[&str],
        k: usize,
    ) -> Result<RetrievedContext> {
        let mut retriever = self.retriever(query, collection);
        retriever.similarity_search(k).await?;
        self.finish(&mut retriever, attributes).await
    }

    /// Apply the optional steps and collect contents in result order.
    /// Documents whose attributes are all missing contribute nothing.
    async fn finish(&self, retriever: &mut Retriever, attributes: &[&str]) -> Result<RetrievedContext> {
        if self.settings.use_reranking {
            retriever.rerank(attributes).await?;
        }

        let contents = if self.settings.use_diversity_filter {
            retriever
                .cosine_filter(
                    attributes,
                    self.settings.diversity_threshold,
                    self.settings.diversity_cap,
                )
                .await?
                .to_vec()
        } else {
            retriever.candidate_texts(attributes).await?
        };

        Ok(RetrievedContext {
            contents: contents.into_iter().filter(|c| !c.is_empty()).collect(),
        })
    }
}
