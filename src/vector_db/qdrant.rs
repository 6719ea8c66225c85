// Qdrant-backed vector store
use async_trait::async_trait;
use qdrant_client::qdrant::{
    point_id::PointIdOptions, value::Kind, vectors_output::VectorsOptions,
    Condition as QdrantCondition, CreateCollectionBuilder, Distance, Filter as QdrantFilter,
    GetPointsBuilder, NamedVectors, PointId, PointStruct, SearchPointsBuilder,
    SparseVectorParamsBuilder, SparseVectorsConfigBuilder, UpsertPointsBuilder,
    Value as QdrantValue, Vector, VectorParamsBuilder, VectorsConfigBuilder, VectorsOutput,
};
use qdrant_client::Qdrant;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::config::QdrantSettings;
use crate::embedding::EmbeddingProvider;
use crate::errors::Result;
use crate::types::{Condition, Document, Filter, Payload};
use crate::vector_db::{Point, VectorStore};

/// Name of the dense cosine vector in every collection
pub const DENSE_VECTOR: &str = "dense";
/// Name of the sparse term-weight vector in every collection
pub const SPARSE_VECTOR: &str = "sparse";

/// Vector store backed by a Qdrant server
pub struct QdrantStore {
    client: Qdrant,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl QdrantStore {
    /// Connect to the server described by `settings`
    pub fn connect(settings: &QdrantSettings, embedder: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        let mut builder =
            Qdrant::from_url(&settings.url).timeout(Duration::from_secs(settings.timeout_secs));
        if let Some(api_key) = &settings.api_key {
            builder = builder.api_key(api_key.clone());
        }
        let client = builder.build()?;

        tracing::debug!(url = %settings.url, "connected to Qdrant");
        Ok(Self { client, embedder })
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn create_collection(&self, name: &str, dense_dim: u64) -> Result<()> {
        if self.client.collection_exists(name).await? {
            self.client.delete_collection(name).await?;
            tracing::info!(collection = name, "deleted old version of collection");
        }

        let mut vectors = VectorsConfigBuilder::default();
        vectors.add_named_vector_params(
            DENSE_VECTOR,
            VectorParamsBuilder::new(dense_dim, Distance::Cosine).build(),
        );
        let mut sparse = SparseVectorsConfigBuilder::default();
        sparse.add_named_vector_params(SPARSE_VECTOR, SparseVectorParamsBuilder::default());

        self.client
            .create_collection(
                CreateCollectionBuilder::new(name)
                    .vectors_config(vectors)
                    .sparse_vectors_config(sparse),
            )
            .await?;

        tracing::info!(collection = name, dim = dense_dim, "collection initialized");
        Ok(())
    }

    async fn collection_exists(&self, name: &str) -> Result<bool> {
        Ok(self.client.collection_exists(name).await?)
    }

    async fn upsert(&self, collection: &str, points: Vec<Point>) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }

        let points: Vec<PointStruct> = points.into_iter().map(to_point_struct).collect();
        self.client
            .upsert_points(UpsertPointsBuilder::new(collection, points).wait(true))
            .await?;
        Ok(())
    }

    async fn similarity_search(
        &self,
        collection: &str,
        query: &str,
        k: usize,
        filter: Option<&Filter>,
    ) -> Result<Vec<Document>> {
        let query_vector = self.embedder.dense_embed(query).await?;

        let mut request = SearchPointsBuilder::new(collection, query_vector, k as u64)
            .vector_name(DENSE_VECTOR)
            .with_payload(true)
            .with_vectors(true);
        if let Some(filter) = filter {
            request = request.filter(to_qdrant_filter(filter));
        }

        let response = self.client.search_points(request).await?;

        let documents = response
            .result
            .into_iter()
            .map(|point| Document {
                id: point_id_to_string(&point.id),
                embedding: dense_from_output(point.vectors),
                payload: payload_from_qdrant(point.payload),
                score: point.score,
            })
            .collect();

        Ok(documents)
    }

    async fn retrieve_payload(&self, collection: &str, id: &str) -> Result<Option<Payload>> {
        let response = self
            .client
            .get_points(
                GetPointsBuilder::new(collection, vec![PointId::from(id.to_string())])
                    .with_payload(true),
            )
            .await?;

        Ok(response
            .result
            .into_iter()
            .next()
            .map(|point| payload_from_qdrant(point.payload)))
    }
}

fn to_point_struct(point: Point) -> PointStruct {
    let mut vectors = NamedVectors::default().add_vector(DENSE_VECTOR, point.dense);
    if let Some(sparse) = point.sparse.filter(|s| !s.is_empty()) {
        vectors = vectors.add_vector(SPARSE_VECTOR, Vector::new_sparse(sparse.indices, sparse.values));
    }

    let payload: HashMap<String, QdrantValue> = point
        .payload
        .to_json()
        .into_iter()
        .map(|(key, value)| (key, json_to_qdrant_value(value)))
        .collect();

    PointStruct::new(point.id, vectors, payload)
}

/// Translate the conjunction into Qdrant `must` conditions
pub fn to_qdrant_filter(filter: &Filter) -> QdrantFilter {
    QdrantFilter::must(filter.must.iter().map(|condition| match condition {
        Condition::Exact { key, value } => QdrantCondition::matches(key.clone(), value.clone()),
        Condition::AnyOf { key, values } => QdrantCondition::matches(key.clone(), values.clone()),
    }))
}

#[allow(deprecated)]
fn dense_from_output(vectors: Option<VectorsOutput>) -> Vec<f32> {
    match vectors.and_then(|v| v.vectors_options) {
        Some(VectorsOptions::Vector(vector)) => vector.data,
        Some(VectorsOptions::Vectors(named)) => named
            .vectors
            .get(DENSE_VECTOR)
            .map(|v| v.data.clone())
            .unwrap_or_default(),
        None => Vec::new(),
    }
}

fn payload_from_qdrant(payload: HashMap<String, QdrantValue>) -> Payload {
    let map: serde_json::Map<String, JsonValue> = payload
        .into_iter()
        .filter_map(|(key, value)| qdrant_to_json_value(&value).map(|json| (key, json)))
        .collect();
    Payload::from_json(JsonValue::Object(map))
}

// Helper functions for type conversions
fn json_to_qdrant_value(json: JsonValue) -> QdrantValue {
    match json {
        JsonValue::String(s) => QdrantValue::from(s),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                QdrantValue::from(i)
            } else if let Some(f) = n.as_f64() {
                QdrantValue::from(f)
            } else {
                QdrantValue::from(0)
            }
        }
        JsonValue::Bool(b) => QdrantValue::from(b),
        other => QdrantValue::from(other.to_string()),
    }
}

fn qdrant_to_json_value(value: &QdrantValue) -> Option<JsonValue> {
    value.kind.as_ref().and_then(|kind| match kind {
        Kind::StringValue(s) => Some(JsonValue::String(s.clone())),
        Kind::IntegerValue(i) => Some(JsonValue::Number((*i).into())),
        Kind::DoubleValue(f) => serde_json::Number::from_f64(*f).map(JsonValue::Number),
        Kind::BoolValue(b) => Some(JsonValue::Bool(*b)),
        _ => None,
    })
}

fn point_id_to_string(point_id: &Option<PointId>) -> String {
    point_id
        .as_ref()
        .and_then(|id| match &id.point_id_options {
            Some(PointIdOptions::Num(n)) => Some(n.to_string()),
            Some(PointIdOptions::Uuid(u)) => Some(u.clone()),
            None => None,
        })
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::country_policy_filter;

    #[test]
    fn test_filter_translation() {
        let filter = country_policy_filter("France", 2098, 2100);
        let qdrant = to_qdrant_filter(&filter);
        assert_eq!(qdrant.must.len(), 2);
        assert!(qdrant.should.is_empty());
    }

    #[test]
    fn test_value_round_trip_scalars() {
        for json in [
            JsonValue::String("France".to_string()),
            JsonValue::from(2020),
            JsonValue::Bool(true),
        ] {
            let qdrant = json_to_qdrant_value(json.clone());
            assert_eq!(qdrant_to_json_value(&qdrant), Some(json));
        }
    }

    #[test]
    fn test_payload_from_qdrant() {
        let mut raw = HashMap::new();
        raw.insert("country".to_string(), QdrantValue::from("Chile".to_string()));
        raw.insert("year".to_string(), QdrantValue::from("2018".to_string()));
        raw.insert("relevance".to_string(), QdrantValue::from(1i64));

        let payload = payload_from_qdrant(raw);
        assert_eq!(payload.country.as_deref(), Some("Chile"));
        assert_eq!(payload.year.as_deref(), Some("2018"));
        assert_eq!(payload.relevance, Some(1));
    }

    #[test]
    fn test_missing_point_id() {
        assert_eq!(point_id_to_string(&None), "unknown");
        assert_eq!(point_id_to_string(&Some(PointId::from(7u64))), "7");
    }

    #[test]
    fn test_missing_vectors_are_empty() {
        assert!(dense_from_output(None).is_empty());
    }
}
