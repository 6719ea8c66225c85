//! Question answering over retrieved context

use crate::errors::Result;
use crate::llm::{ChatMessage, ChatModel, CompletionParams};
use crate::rag::RetrievedContext;

/// Shown to the model in place of an empty context
pub const NO_CONTEXT_MARKER: &str = "(no relevant information was found)";

const MAX_ANSWER_TOKENS: u32 = 1000;

const RESPOND_SYSTEM: &str = "You are a helpful assistant who will answer the user's question based only on (but not only on) the relevant parts \
of the provided context. Do not bring in information that is not directly related to the user's question. \
Provide a concise explanation of the question and how it relates to the relevant context.";

const KNOWLEDGE_SYSTEM: &str = "You are a helpful assistant who will answer the user's question based only on (but not only on) the relevant parts \
of the provided context about climate policies and provided climate knowledge. Do not bring in information that is not directly related to the user's question. \
Provide a concise explanation of the question and how it relates to the relevant context.";

/// Answer `query` from one block of background context
pub async fn respond(model: &dyn ChatModel, query: &str, context: &RetrievedContext) -> Result<String> {
    let messages = [
        ChatMessage::system(RESPOND_SYSTEM),
        ChatMessage::user(format!(
            "The user's question is: {}\n\nBelow is some background information:\n\n{}\n\n",
            query,
            context.text_or(NO_CONTEXT_MARKER)
        )),
    ];
    model
        .complete(&messages, CompletionParams::max_tokens(MAX_ANSWER_TOKENS))
        .await
}

/// Answer `query` from policy context plus knowledge-base context
pub async fn answer_with_knowledge(
    model: &dyn ChatModel,
    query: &str,
    policies: &RetrievedContext,
    knowledge: &RetrievedContext,
) -> Result<String> {
    let messages = [
        ChatMessage::system(KNOWLEDGE_SYSTEM),
        ChatMessage::user(format!(
            "The user's question is: {}\n\n\
             Below is the climate policy context:\n\n{}\n\n\
             Below is the knowledge that may be useful:\n\n{}\n\n",
            query,
            policies.text_or(NO_CONTEXT_MARKER),
            knowledge.text_or(NO_CONTEXT_MARKER)
        )),
    ];
    model
        .complete(&messages, CompletionParams::max_tokens(MAX_ANSWER_TOKENS))
        .await
}
