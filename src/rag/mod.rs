// Retrieval-augmented generation core
//
// Turns a query plus structured filters into a ranked, deduplicated
// context window.
//
// Components:
// - Retriever: similarity search, optional reranking, diversity filtering
// - Diversity: greedy cosine-similarity selection
// - Re-ranking: cross-encoder relevance scoring
// - Context: country-policy and knowledge assemblers

pub mod context;
pub mod diversity;
pub mod reranking;
pub mod retrieval;

pub use context::{ContextAssembler, RetrievedContext, KNOWLEDGE_ATTRIBUTES, POLICY_ATTRIBUTES};
pub use diversity::{accept, cosine_similarity, FilteredResultSet};
pub use reranking::{CrossEncoderReranker, RankedDocument, Reranker};
pub use retrieval::Retriever;
