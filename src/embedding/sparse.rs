// Sparse term-weight vectors over tokenizer vocabulary ids
use hf_hub::{api::sync::Api, Repo, RepoType};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tokenizers::Tokenizer;

use crate::embedding::SparseVector;
use crate::errors::{RagError, Result};

pub const DEFAULT_SPARSE_TOKENIZER: &str = "bert-base-uncased";

/// Encodes text as `{token id: 1 + ln(term frequency)}`
#[derive(Clone)]
pub struct SparseEncoder {
    tokenizer: Arc<Tokenizer>,
}

impl SparseEncoder {
    /// Use the tokenizer of a Hub model
    pub fn from_pretrained(model_id: &str) -> Result<Self> {
        let api = Api::new()
            .map_err(|e| RagError::ModelError(format!("HuggingFace API client: {}", e)))?;
        let path = api
            .repo(Repo::new(model_id.to_string(), RepoType::Model))
            .get("tokenizer.json")
            .map_err(|e| RagError::ModelError(format!("Failed to download tokenizer: {}", e)))?;
        Self::from_file(&path)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let tokenizer = Tokenizer::from_file(path)
            .map_err(|e| RagError::ModelError(format!("Failed to load tokenizer: {}", e)))?;
        Ok(Self {
            tokenizer: Arc::new(tokenizer),
        })
    }

    pub fn encode(&self, text: &str) -> Result<SparseVector> {
        let encoding = self
            .tokenizer
            .encode(text, false)
            .map_err(|e| RagError::ModelError(format!("Tokenization failed: {}", e)))?;
        Ok(term_weights(encoding.get_ids()))
    }
}

/// Sublinear term-frequency weights, indices ascending
pub fn term_weights(ids: &[u32]) -> SparseVector {
    let mut counts: BTreeMap<u32, u32> = BTreeMap::new();
    for id in ids {
        *counts.entry(*id).or_insert(0) += 1;
    }

    let (indices, values) = counts
        .into_iter()
        .map(|(id, tf)| (id, 1.0 + (tf as f32).ln()))
        .unzip();

    SparseVector { indices, values }
}
