// Cross-encoder reranker: BERT over (query, passage) pairs with a linear head
use async_trait::async_trait;
use candle_core::{Device, Module, Tensor};
use candle_nn::{linear, Linear};
use candle_transformers::models::bert::BertModel;
use std::sync::Arc;
use tokenizers::Tokenizer;

use crate::embedding::engine::{encode_batch, BertCheckpoint};
use crate::errors::{RagError, Result};
use crate::rag::reranking::Reranker;

pub const DEFAULT_CROSS_ENCODER: &str = "cross-encoder/ms-marco-MiniLM-L-6-v2";
const BATCH_SIZE: usize = 16;

/// Sequence-classification BERT scoring query/passage relevance
pub struct CrossEncoderReranker {
    model: Arc<BertModel>,
    pooler: Linear,
    classifier: Linear,
    tokenizer: Arc<Tokenizer>,
    device: Device,
}

impl CrossEncoderReranker {
    /// Load a cross-encoder checkpoint (downloads on first use)
    pub fn new(model_id: &str) -> Result<Self> {
        let device = Device::Cpu;
        let checkpoint = BertCheckpoint::fetch(model_id)?;
        let vb = checkpoint.var_builder(&device)?;
        let hidden = checkpoint.hidden_size;

        let model = BertModel::load(vb.clone(), &checkpoint.config)?;
        let pooler = linear(hidden, hidden, vb.pp("bert.pooler.dense"))?;
        let classifier = linear(hidden, 1, vb.pp("classifier"))?;

        tracing::info!(model = model_id, "cross-encoder ready");

        Ok(Self {
            model: Arc::new(model),
            pooler,
            classifier,
            tokenizer: Arc::new(checkpoint.tokenizer),
            device,
        })
    }

    fn score_batch(&self, query: &str, texts: &[String]) -> Result<Vec<f32>> {
        let pairs: Vec<(&str, &str)> = texts.iter().map(|t| (query, t.as_str())).collect();
        let encodings = self
            .tokenizer
            .encode_batch(pairs, true)
            .map_err(|e| RagError::ModelError(format!("Tokenization failed: {}", e)))?;
        let batch = encode_batch(encodings, &self.device)?;

        let hidden = self
            .model
            .forward(&batch.ids, &batch.type_ids, Some(&batch.mask))?;
        let cls = hidden.narrow(1, 0, 1)?.squeeze(1)?;
        let pooled = self.pooler.forward(&cls)?.tanh()?;
        let logits: Tensor = self.classifier.forward(&pooled)?.squeeze(1)?;

        let scores = logits
            .to_vec1::<f32>()?
            .into_iter()
            .map(|logit| 1.0 / (1.0 + (-logit).exp()))
            .collect();
        Ok(scores)
    }
}

#[async_trait]
impl Reranker for CrossEncoderReranker {
    async fn score(&self, query: &str, texts: &[String]) -> Result<Vec<f32>> {
        let mut scores = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(BATCH_SIZE) {
            scores.extend(self.score_batch(query, chunk)?);
        }
        Ok(scores)
    }
}
