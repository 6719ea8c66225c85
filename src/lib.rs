//! climaterag - retrieval-augmented generation over climate policy documents
//!
//! # Architecture
//!
//! - **Ingestion**: PDF text extraction, sentence chunking, LLM relevance
//!   classification and summarization into policy records
//! - **Indexing**: dense + sparse embeddings stored in a vector collection
//! - **Retrieval**: filtered similarity search, optional cross-encoder
//!   reranking and cosine diversity filtering, assembled into prompt context
//! - **Generation**: a question-answering chatbot and a multi-country
//!   policy discussion

pub mod errors;
pub mod config;
pub mod types;
pub mod storage;

// Models and stores
pub mod embedding;
pub mod llm;
pub mod vector_db;

// Retrieval core
pub mod rag;

// Pipeline stages
pub mod ingest;
pub mod indexing;
pub mod chatbot;
pub mod agents;

pub mod cli;

// Re-export commonly used types
pub use errors::{RagError, Result};
pub use config::Config;
pub use rag::{ContextAssembler, RetrievedContext, Retriever};
pub use types::{Document, Filter, Payload};
