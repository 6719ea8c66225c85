//! OpenAI-compatible HTTP client
//!
//! Endpoints:
//! - POST /chat/completions for `ChatModel`
//! - POST /embeddings for `DenseEmbedder`

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::OpenAiSettings;
use crate::embedding::DenseEmbedder;
use crate::errors::{RagError, Result};
use crate::llm::{ChatMessage, ChatModel, CompletionParams};

const SERVICE: &str = "OpenAI";

/// Chat and embedding client
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: String,
    chat_model: String,
    embedding_model: String,
    embedding_dim: usize,
}

impl OpenAiClient {
    /// Build a client from settings; the key comes from the settings or
    /// `OPENAI_API_KEY`
    pub fn from_settings(settings: &OpenAiSettings) -> Result<Self> {
        let api_key = settings.resolved_api_key().ok_or_else(|| {
            RagError::ConfigError(
                "No OpenAI API key: set [openai].api_key or OPENAI_API_KEY".to_string(),
            )
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(RagError::HttpError)?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key,
            chat_model: settings.chat_model.clone(),
            embedding_model: settings.embedding_model.clone(),
            embedding_dim: settings.embedding_dim,
        })
    }

    /// Embed several texts in one request, preserving input order
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbeddingRequest {
            model: &self.embedding_model,
            input: texts,
        };
        let response: EmbeddingResponse = self.post("embeddings", &request).await?;

        let mut data = response.data;
        data.sort_by_key(|d| d.index);
        if data.len() != texts.len() {
            return Err(RagError::remote(
                SERVICE,
                format!("returned {} embeddings for {} inputs", data.len(), texts.len()),
            ));
        }
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }

    async fn post<Req, Resp>(&self, endpoint: &str, body: &Req) -> Result<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: for<'de> Deserialize<'de>,
    {
        let url = format!("{}/{}", self.base_url, endpoint);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| RagError::remote(SERVICE, format!("Failed to send request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(RagError::remote(SERVICE, format!("HTTP {}: {}", status, error_text)));
        }

        response
            .json()
            .await
            .map_err(|e| RagError::remote(SERVICE, format!("Failed to parse response: {}", e)))
    }

    pub fn chat_model(&self) -> &str {
        &self.chat_model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl ChatModel for OpenAiClient {
    async fn complete(&self, messages: &[ChatMessage], params: CompletionParams) -> Result<String> {
        let request = ChatRequest {
            model: &self.chat_model,
            messages,
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        };

        let response: ChatResponse = self.post("chat/completions", &request).await?;
        let reply = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| RagError::remote(SERVICE, "completion contained no message"))?;

        tracing::debug!(model = %self.chat_model, chars = reply.len(), "chat completion");
        Ok(reply)
    }
}

#[async_trait]
impl DenseEmbedder for OpenAiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| RagError::remote(SERVICE, "empty embedding response"))
    }

    fn dimension(&self) -> usize {
        self.embedding_dim
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings_with_key() -> OpenAiSettings {
        OpenAiSettings {
            api_key: Some("sk-test".to_string()),
            base_url: "http://localhost:8080/v1/".to_string(),
            ..OpenAiSettings::default()
        }
    }

    #[test]
    fn test_client_from_settings() {
        let client = OpenAiClient::from_settings(&settings_with_key()).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080/v1");
        assert_eq!(client.chat_model(), "gpt-4o-mini");
        assert_eq!(DenseEmbedder::dimension(&client), 1536);
    }

    #[test]
    fn test_chat_request_omits_unset_params() {
        let messages = vec![ChatMessage::user("hello")];
        let request = ChatRequest {
            model: "gpt-4o-mini",
            messages: &messages,
            temperature: None,
            max_tokens: Some(5),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("temperature").is_none());
        assert_eq!(json["max_tokens"], 5);
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[test]
    fn test_parse_chat_response() {
        let body = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"1"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("1"));
    }

    #[test]
    fn test_parse_embedding_response_out_of_order() {
        let body = r#"{"data":[{"index":1,"embedding":[0.5]},{"index":0,"embedding":[0.25]}]}"#;
        let mut parsed: EmbeddingResponse = serde_json::from_str(body).unwrap();
        parsed.data.sort_by_key(|d| d.index);
        assert_eq!(parsed.data[0].embedding, vec![0.25]);
    }

    #[tokio::test]
    #[ignore] // Integration test - requires OPENAI_API_KEY
    async fn test_live_completion() {
        let client = OpenAiClient::from_settings(&OpenAiSettings::default()).unwrap();
        let reply = client
            .complete(&[ChatMessage::user("Reply with 1")], CompletionParams::new(0.0, 5))
            .await
            .unwrap();
        assert!(!reply.is_empty());
    }
}
