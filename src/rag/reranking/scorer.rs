// Re-ranking of retrieved documents by a relevance model
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::{RagError, Result};
use crate::types::Document;

/// Scores (query, candidate text) pairs; one score per text, same order
#[async_trait]
pub trait Reranker: Send + Sync {
    async fn score(&self, query: &str, texts: &[String]) -> Result<Vec<f32>>;
}

/// Document annotated with its rerank score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedDocument {
    pub document: Document,
    pub score: f32,
}

/// Attach scores and sort descending.
///
/// The sort is stable, so documents with equal scores keep their
/// retrieval order.
pub fn rank_by_scores(documents: Vec<Document>, scores: Vec<f32>) -> Result<Vec<RankedDocument>> {
    if documents.len() != scores.len() {
        return Err(RagError::remote(
            "Reranker",
            format!("returned {} scores for {} documents", scores.len(), documents.len()),
        ));
    }

    let mut ranked: Vec<RankedDocument> = documents
        .into_iter()
        .zip(scores)
        .map(|(document, score)| RankedDocument { document, score })
        .collect();

    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    Ok(ranked)
}
