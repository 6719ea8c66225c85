// Retrieval module
pub mod engine;

pub use engine::{Retriever, DEFAULT_CALL_TIMEOUT};
