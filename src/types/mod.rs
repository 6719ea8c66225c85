//! Core data types shared by stores, retrievers and ingestion

pub mod document;
pub mod filter;

pub use document::{Document, Payload};
pub use filter::{
    country_policy_filter, Condition, Filter, DEFAULT_YEAR_UPPER_BOUND, MIN_POLICY_YEAR,
};
