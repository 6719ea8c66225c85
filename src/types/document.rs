//! Retrieval hits and their typed payloads

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Payload attached to a stored point.
///
/// The well-known keys of chunk, policy and knowledge records are explicit
/// optional fields; anything else lands in `extra`. When a key is absent
/// its text contribution is the empty string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    /// Stored as a string so that "Nan" and free-form years survive
    #[serde(
        default,
        deserialize_with = "string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub year: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance: Option<u8>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

/// Accept `"2020"`, `2020` or null for string-typed fields
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Option::<JsonValue>::deserialize(deserializer)? {
        Some(JsonValue::String(s)) => Some(s),
        Some(JsonValue::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

impl Payload {
    /// Build from an arbitrary JSON object. Non-object values yield an empty payload.
    pub fn from_json(value: JsonValue) -> Self {
        match value {
            JsonValue::Object(_) => serde_json::from_value(value).unwrap_or_else(|e| {
                tracing::warn!("payload did not match the record shape: {}", e);
                Payload::default()
            }),
            _ => Payload::default(),
        }
    }

    /// Convert to a JSON object for storage
    pub fn to_json(&self) -> Map<String, JsonValue> {
        match serde_json::to_value(self) {
            Ok(JsonValue::Object(map)) => map,
            _ => Map::new(),
        }
    }

    /// Text of a single attribute, if present.
    ///
    /// `relevance` is numeric and has no text form, so it always reads as
    /// absent here.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        match name {
            "content" => self.content.as_deref(),
            "summary" => self.summary.as_deref(),
            "country" => self.country.as_deref(),
            "year" => self.year.as_deref(),
            "policy" => self.policy.as_deref(),
            "effect" => self.effect.as_deref(),
            "relevance" => None,
            other => self.extra.get(other).and_then(|v| v.as_str()),
        }
    }

    /// Concatenate the named attributes in order; missing ones count as "".
    pub fn text_of<S: AsRef<str>>(&self, attributes: &[S]) -> String {
        attributes
            .iter()
            .map(|name| self.attribute(name.as_ref()).unwrap_or(""))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        *self == Payload::default()
    }
}

/// One retrieval hit as returned by a vector store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    /// Dense vector; empty when the store was not asked for vectors
    pub embedding: Vec<f32>,
    pub payload: Payload,
    /// Similarity score assigned by the store
    pub score: f32,
}

impl Document {
    pub fn new(id: impl Into<String>, embedding: Vec<f32>, payload: Payload) -> Self {
        Self {
            id: id.into(),
            embedding,
            payload,
            score: 0.0,
        }
    }
}
