//! Configuration management for climaterag
//!
//! TOML-based configuration with per-section defaults and validation.
//! Location: ~/.climaterag/config.toml

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::{RagError, Result};
use crate::types::DEFAULT_YEAR_UPPER_BOUND;

/// Complete configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub qdrant: QdrantSettings,
    pub openai: OpenAiSettings,
    pub embedding: EmbeddingSettings,
    pub reranker: RerankerSettings,
    pub retrieval: RetrievalSettings,
    pub chunking: ChunkingSettings,
    pub agents: AgentSettings,
}

/// Qdrant connection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QdrantSettings {
    pub url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

/// OpenAI-compatible chat and embedding endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiSettings {
    pub base_url: String,
    /// Falls back to the `OPENAI_API_KEY` environment variable
    pub api_key: Option<String>,
    pub chat_model: String,
    pub embedding_model: String,
    pub embedding_dim: usize,
    pub timeout_secs: u64,
}

/// Which dense embedder to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    OpenAi,
    Local,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub provider: EmbeddingBackend,
    pub local_model: String,
    pub sparse_tokenizer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankerSettings {
    pub model: String,
}

/// Retrieval behaviour of the context assemblers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub k: usize,
    pub use_reranking: bool,
    pub use_diversity_filter: bool,
    pub diversity_threshold: f32,
    pub diversity_cap: usize,
    pub year_upper_bound: i32,
    pub call_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    pub chunk_size: usize,
    pub overlap: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for QdrantSettings {
    fn default() -> Self {
        Self {
            url: "http://localhost:6334".to_string(),
            api_key: None,
            timeout_secs: 30,
        }
    }
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            chat_model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            embedding_dim: 1536,
            timeout_secs: 60,
        }
    }
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingBackend::OpenAi,
            local_model: crate::embedding::engine::DEFAULT_LOCAL_MODEL.to_string(),
            sparse_tokenizer: crate::embedding::sparse::DEFAULT_SPARSE_TOKENIZER.to_string(),
        }
    }
}

impl Default for RerankerSettings {
    fn default() -> Self {
        Self {
            model: crate::rag::reranking::DEFAULT_CROSS_ENCODER.to_string(),
        }
    }
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            k: 50,
            use_reranking: false,
            use_diversity_filter: false,
            diversity_threshold: 0.8,
            diversity_cap: 30,
            year_upper_bound: DEFAULT_YEAR_UPPER_BOUND,
            call_timeout_secs: 30,
        }
    }
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            chunk_size: 512,
            overlap: 50,
        }
    }
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 1000,
        }
    }
}

impl OpenAiSettings {
    /// Configured key, else `OPENAI_API_KEY`
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
    }
}

impl Config {
    /// Load configuration from file or use defaults
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        if let Some(config_path) = path {
            Self::load_from_file(&config_path)
        } else {
            Self::load_default()
        }
    }

    /// Load configuration from specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| RagError::ConfigError(format!("Failed to read config: {}", e)))?;

        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)
            .map_err(|e| RagError::ConfigError(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load from ~/.climaterag/config.toml when present, else built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Some(config_path) = Self::default_path() {
            if config_path.exists() {
                return Self::load_from_file(&config_path);
            }
        }

        Ok(Config::default())
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".climaterag").join("config.toml"))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let retrieval = &self.retrieval;

        if retrieval.k == 0 {
            return Err(RagError::ConfigError("retrieval.k must be greater than 0".to_string()));
        }

        if !(0.0..=1.0).contains(&retrieval.diversity_threshold) {
            return Err(RagError::ConfigError(
                "diversity_threshold must be between 0.0 and 1.0".to_string(),
            ));
        }

        if retrieval.diversity_cap == 0 {
            return Err(RagError::ConfigError(
                "diversity_cap must be greater than 0".to_string(),
            ));
        }

        if retrieval.call_timeout_secs == 0 {
            return Err(RagError::ConfigError(
                "call_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.chunking.chunk_size == 0 || self.chunking.overlap >= self.chunking.chunk_size {
            return Err(RagError::ConfigError(
                "chunking.overlap must be less than a non-zero chunk_size".to_string(),
            ));
        }

        if self.openai.embedding_dim == 0 {
            return Err(RagError::ConfigError(
                "openai.embedding_dim must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| RagError::ConfigError(format!("Failed to serialize config: {}", e)))
    }
}
