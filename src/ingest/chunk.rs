//! Chunk records and their language-model processing
//!
//! A chunk is classified for climate-policy relevance and then summarized
//! either as a policy record (Policy/Effect/Country/Year) or as bullet-point
//! knowledge.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::{RagError, Result};
use crate::ingest::progress_bar;
use crate::llm::{ask, ChatModel, CompletionParams};
use crate::storage;

const CLASSIFY_PROMPT: &str = r#"You are a text classifier specialized in policy analysis. Your task is to determine whether the provided text contains information relevant to climate policies. For this task, "climate policies" include any discussion about governmental, international, or organizational decisions, strategies, or actions aimed at addressing climate change. Relevant topics include (but are not limited to) carbon taxes, renewable energy initiatives, climate agreements (e.g., the Paris Agreement), emissions regulations, and adaptation/mitigation strategies.

Instructions:
1. Read the text carefully.
2. If the text includes any discussion of policies, decisions, or actions related to climate change, classify it as **1**.
3. If the text does not mention any such information, classify it as **0**.
4. Do not provide any explanations, answer with exactly one number.

Examples:
- Text: "The government introduced a new carbon tax aimed at reducing greenhouse gas emissions."
- 1
- Text: "The local sports team won their championship game last night."
- 0

Now, classify the following text:
"#;

const RECORD_PROMPT: &str = r#"You are an expert in extracting information. Your task is to provide a detailed summary of:
- The policy or policies mentioned
- The effect of the policy
- The country that applied the policy (Use exactly only the country name)
- The year associated with the policy (Use exactly the year number)

Use the exact structure below:
Policy:
Effect:
Country:
Year:

For any missing or unavailable information, fill it using your knowledge.
If still not possible, fill Nan.
Sometimes you get a city name rather than a country name, it is necessary to convert it to a country name.
"#;

const KNOWLEDGE_PROMPT: &str = "You are an expert in extracting information. Your task is to provide a summary of the given context using bullet points.\n\
The given context is from a manual introducing knowledges of climates or possible effects of climate.\n";

/// A piece of source text with its processing results
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    #[serde(default)]
    pub relevance: Option<u8>,
    #[serde(default)]
    pub summary: Option<String>,
}

impl Chunk {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    /// Ask the model whether this chunk discusses climate policy
    pub async fn classify_relevance(&mut self, model: &dyn ChatModel) -> Result<u8> {
        let prompt = format!("{}\n\"\"\"{}\"\"\"", CLASSIFY_PROMPT, self.content);
        let answer = ask(model, &prompt, CompletionParams::new(0.0, 5)).await?;
        let relevance = parse_relevance(&answer);
        self.relevance = Some(relevance);
        Ok(relevance)
    }

    /// Summarize as a Policy/Effect/Country/Year record
    pub async fn summarize_record(&mut self, model: &dyn ChatModel) -> Result<&str> {
        let prompt = format!(
            "{}\nText:\n\"\"\"{}\"\"\"\n\nSummary:",
            RECORD_PROMPT, self.content
        );
        self.summarize(model, &prompt).await
    }

    /// Summarize as bullet-point background knowledge
    pub async fn summarize_knowledge(&mut self, model: &dyn ChatModel) -> Result<&str> {
        let prompt = format!(
            "{}\nText:\n\"\"\"{}\"\"\"\n\nSummary:",
            KNOWLEDGE_PROMPT, self.content
        );
        self.summarize(model, &prompt).await
    }

    async fn summarize(&mut self, model: &dyn ChatModel, prompt: &str) -> Result<&str> {
        let answer = ask(model, prompt, CompletionParams::new(0.3, 300)).await?;
        Ok(self.summary.insert(answer.trim().to_string()).as_str())
    }

    pub fn is_relevant(&self) -> bool {
        self.relevance == Some(1)
    }
}

/// First `0` or `1` in the answer; anything else counts as not relevant
pub fn parse_relevance(answer: &str) -> u8 {
    match answer.chars().find(|c| matches!(c, '0' | '1')) {
        Some('1') => 1,
        _ => 0,
    }
}

/// Which summary template to apply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryKind {
    Record,
    Knowledge,
}

/// The chunks produced from one document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChunkSet {
    pub chunks: Vec<Chunk>,
}

impl ChunkSet {
    pub fn from_texts(texts: impl IntoIterator<Item = String>) -> Self {
        Self {
            chunks: texts.into_iter().map(Chunk::new).collect(),
        }
    }

    /// Load a chunk file written by `save`
    pub fn load(path: &Path) -> Result<Self> {
        storage::load_json(path)?
            .ok_or_else(|| RagError::Generic(format!("No chunk file at {}", path.display())))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        storage::save_json(self, path)
    }

    /// Classify every chunk, one model call at a time
    pub async fn classify_all(&mut self, model: &dyn ChatModel, label: &str) -> Result<()> {
        let pb = progress_bar(self.chunks.len(), &format!("Classifying {}", label));
        for chunk in &mut self.chunks {
            chunk.classify_relevance(model).await?;
            pb.inc(1);
        }
        pb.finish_and_clear();
        Ok(())
    }

    /// Summarize every chunk with the given template
    pub async fn summarize_all(&mut self, model: &dyn ChatModel, kind: SummaryKind, label: &str) -> Result<()> {
        let pb = progress_bar(self.chunks.len(), &format!("Summarizing {}", label));
        for chunk in &mut self.chunks {
            match kind {
                SummaryKind::Record => chunk.summarize_record(model).await?,
                SummaryKind::Knowledge => chunk.summarize_knowledge(model).await?,
            };
            pb.inc(1);
        }
        pb.finish_and_clear();
        Ok(())
    }

    /// Keep only chunks classified as relevant; returns how many were dropped
    pub fn retain_relevant(&mut self) -> usize {
        let before = self.chunks.len();
        self.chunks.retain(Chunk::is_relevant);
        let dropped = before - self.chunks.len();
        tracing::info!(dropped, kept = self.chunks.len(), "filtered chunks by relevance");
        dropped
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ChatMessage;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Replies with canned answers in order
    struct ScriptedModel {
        replies: Mutex<Vec<String>>,
    }

    impl ScriptedModel {
        fn new(replies: &[&str]) -> Self {
            Self {
                replies: Mutex::new(replies.iter().rev().map(|s| s.to_string()).collect()),
            }
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        async fn complete(&self, _messages: &[ChatMessage], _params: CompletionParams) -> Result<String> {
            Ok(self.replies.lock().unwrap().pop().unwrap_or_default())
        }
    }

    #[test]
    fn test_parse_relevance() {
        assert_eq!(parse_relevance("1"), 1);
        assert_eq!(parse_relevance(" 0\n"), 0);
        assert_eq!(parse_relevance("Answer: 1"), 1);
        assert_eq!(parse_relevance("0 or 1"), 0);
        assert_eq!(parse_relevance("yes"), 0);
        assert_eq!(parse_relevance(""), 0);
    }

    #[tokio::test]
    async fn test_classify_and_retain() {
        let model = ScriptedModel::new(&["1", "0", "unsure", "1"]);
        let mut set = ChunkSet::from_texts(
            ["carbon tax", "football", "weather", "paris agreement"]
                .iter()
                .map(|s| s.to_string()),
        );

        set.classify_all(&model, "test").await.unwrap();
        let dropped = set.retain_relevant();

        assert_eq!(dropped, 2);
        let kept: Vec<_> = set.chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(kept, vec!["carbon tax", "paris agreement"]);
    }

    #[tokio::test]
    async fn test_summary_is_trimmed() {
        let model = ScriptedModel::new(&["  Policy: x\nEffect: y  \n"]);
        let mut chunk = Chunk::new("text");
        let summary = chunk.summarize_record(&model).await.unwrap();
        assert_eq!(summary, "Policy: x\nEffect: y");
    }

    #[test]
    fn test_save_and_load_chunks() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chunks.json");
        let mut set = ChunkSet::from_texts(vec!["a".to_string()]);
        set.chunks[0].relevance = Some(1);

        set.save(&path).unwrap();
        assert_eq!(ChunkSet::load(&path).unwrap(), set);
    }

    #[test]
    fn test_chunk_file_is_plain_array() {
        let json = r#"[{"content":"a","relevance":null,"summary":null},{"content":"b"}]"#;
        let set: ChunkSet = serde_json::from_str(json).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.chunks[1].relevance, None);
    }
}
