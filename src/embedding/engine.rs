// Local embedding engine - BERT sentence embeddings via Candle
use async_trait::async_trait;
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config};
use hf_hub::{api::sync::Api, Repo, RepoType};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokenizers::{Tokenizer, TruncationParams};

use crate::embedding::DenseEmbedder;
use crate::errors::{RagError, Result};

pub const DEFAULT_LOCAL_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";
const MAX_SEQUENCE_LEN: usize = 512;

/// Files of a BERT-family checkpoint on the HuggingFace Hub
pub(crate) struct BertCheckpoint {
    pub config: Config,
    pub hidden_size: usize,
    pub tokenizer: Tokenizer,
    pub weights: PathBuf,
}

#[derive(Deserialize)]
struct HiddenSize {
    hidden_size: usize,
}

impl BertCheckpoint {
    /// Download (or reuse the cached) config, tokenizer and weights
    pub fn fetch(model_id: &str) -> Result<Self> {
        let api = Api::new()
            .map_err(|e| RagError::ModelError(format!("HuggingFace API client: {}", e)))?;
        let repo = api.repo(Repo::new(model_id.to_string(), RepoType::Model));

        let fetch = |file: &str| {
            repo.get(file)
                .map_err(|e| RagError::ModelError(format!("Failed to download {}: {}", file, e)))
        };
        let config_path = fetch("config.json")?;
        let tokenizer_path = fetch("tokenizer.json")?;
        let weights = fetch("model.safetensors")?;

        let config_contents = std::fs::read_to_string(config_path)?;
        let config: Config = serde_json::from_str(&config_contents)?;
        let HiddenSize { hidden_size } = serde_json::from_str(&config_contents)?;

        let mut tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| RagError::ModelError(format!("Failed to load tokenizer: {}", e)))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_SEQUENCE_LEN,
                ..Default::default()
            }))
            .map_err(|e| RagError::ModelError(format!("Invalid truncation: {}", e)))?;

        Ok(Self {
            config,
            hidden_size,
            tokenizer,
            weights,
        })
    }

    pub fn var_builder(&self, device: &Device) -> Result<VarBuilder<'static>> {
        // Safety: the safetensors file lives in the hub cache and is not mutated while mapped.
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[self.weights.clone()], DType::F32, device)?
        };
        Ok(vb)
    }
}

/// Token ids, type ids and attention mask for a batch, right-padded
pub(crate) struct EncodedBatch {
    pub ids: Tensor,
    pub type_ids: Tensor,
    pub mask: Tensor,
}

pub(crate) fn encode_batch(
    encodings: Vec<tokenizers::Encoding>,
    device: &Device,
) -> Result<EncodedBatch> {
    let batch_size = encodings.len();
    let max_len = encodings.iter().map(|e| e.get_ids().len()).max().unwrap_or(0);

    let mut ids = vec![0u32; batch_size * max_len];
    let mut type_ids = vec![0u32; batch_size * max_len];
    let mut mask = vec![0u32; batch_size * max_len];

    for (i, encoding) in encodings.iter().enumerate() {
        let row = i * max_len;
        let len = encoding.get_ids().len();
        ids[row..row + len].copy_from_slice(encoding.get_ids());
        type_ids[row..row + len].copy_from_slice(encoding.get_type_ids());
        mask[row..row + len].copy_from_slice(encoding.get_attention_mask());
    }

    Ok(EncodedBatch {
        ids: Tensor::from_vec(ids, (batch_size, max_len), device)?,
        type_ids: Tensor::from_vec(type_ids, (batch_size, max_len), device)?,
        mask: Tensor::from_vec(mask, (batch_size, max_len), device)?,
    })
}

/// Sentence embedding model running on the CPU
pub struct LocalEmbedder {
    model: Arc<BertModel>,
    tokenizer: Arc<Tokenizer>,
    device: Device,
    dimension: usize,
}

impl LocalEmbedder {
    /// Load a sentence-transformers checkpoint (downloads on first use)
    pub fn new(model_id: &str) -> Result<Self> {
        let device = Device::Cpu;
        let checkpoint = BertCheckpoint::fetch(model_id)?;
        let vb = checkpoint.var_builder(&device)?;
        let model = BertModel::load(vb, &checkpoint.config)?;

        tracing::info!(model = model_id, dim = checkpoint.hidden_size, "local embedder ready");

        Ok(Self {
            model: Arc::new(model),
            tokenizer: Arc::new(checkpoint.tokenizer),
            device,
            dimension: checkpoint.hidden_size,
        })
    }

    /// Generate embeddings for multiple texts
    pub fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| RagError::ModelError(format!("Tokenization failed: {}", e)))?;
        let batch = encode_batch(encodings, &self.device)?;

        let hidden = self
            .model
            .forward(&batch.ids, &batch.type_ids, Some(&batch.mask))?;
        let pooled = Self::mean_pool(&hidden, &batch.mask)?;

        Ok(pooled.to_vec2::<f32>()?)
    }

    /// Mean pooling with attention mask
    fn mean_pool(embeddings: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
        let mask_expanded = attention_mask
            .unsqueeze(2)?
            .expand(embeddings.shape())?
            .to_dtype(embeddings.dtype())?;

        let sum_embeddings = (embeddings * &mask_expanded)?.sum(1)?;
        let sum_mask = mask_expanded.sum(1)?.clamp(1e-9, f64::MAX)?;

        Ok(sum_embeddings.broadcast_div(&sum_mask)?)
    }
}

#[async_trait]
impl DenseEmbedder for LocalEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text])?
            .pop()
            .ok_or_else(|| RagError::ModelError("empty embedding batch".to_string()))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
