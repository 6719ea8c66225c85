// Re-ranking module
pub mod cross_encoder;
pub mod scorer;

pub use cross_encoder::{CrossEncoderReranker, DEFAULT_CROSS_ENCODER};
pub use scorer::{rank_by_scores, RankedDocument, Reranker};
