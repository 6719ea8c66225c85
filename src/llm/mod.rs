//! Chat-completion and embedding clients
//!
//! `ChatModel` is the seam the chatbot, the chunk classifiers and the
//! country agents talk to; `OpenAiClient` is the HTTP implementation.

pub mod client;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::Result;

pub use client::OpenAiClient;

/// Speaker of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Sampling parameters for one completion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionParams {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl CompletionParams {
    pub fn new(temperature: f32, max_tokens: u32) -> Self {
        Self {
            temperature: Some(temperature),
            max_tokens: Some(max_tokens),
        }
    }

    /// Provider defaults for temperature, capped length
    pub fn max_tokens(max_tokens: u32) -> Self {
        Self {
            temperature: None,
            max_tokens: Some(max_tokens),
        }
    }
}

/// Produces the assistant reply to a conversation
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage], params: CompletionParams) -> Result<String>;
}

/// Single-turn helper: generic system prompt plus one user prompt
pub async fn ask(model: &dyn ChatModel, prompt: &str, params: CompletionParams) -> Result<String> {
    let messages = [
        ChatMessage::system("You are a helpful assistant."),
        ChatMessage::user(prompt),
    ];
    model.complete(&messages, params).await
}
