//! Subcommand execution
//!
//! `App` wires configuration into concrete collaborators (embedder, vector
//! store, chat model, reranker) and runs one pipeline stage per call.

use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::agents::Discussion;
use crate::chatbot;
use crate::cli::args::{parse_stances, Commands, IndexKind, SummaryStyle};
use crate::config::{Config, EmbeddingBackend};
use crate::embedding::{DenseEmbedder, EmbeddingProvider, HybridEmbedder, LocalEmbedder, SparseEncoder};
use crate::errors::{RagError, Result};
use crate::indexing::Indexer;
use crate::ingest::{Chunk, ChunkSet, PdfSource, PolicyRecord, SentenceChunker, SummaryKind};
use crate::llm::OpenAiClient;
use crate::rag::{ContextAssembler, CrossEncoderReranker};
use crate::storage;
use crate::vector_db::{Collection, QdrantStore, VectorStore};

pub struct App {
    config: Config,
}

impl App {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub async fn run(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Extract { input_dir, output_dir } => self.extract(&input_dir, &output_dir),
            Commands::Chunk {
                input_dir,
                text_dir,
                output_dir,
                chunk_size,
                overlap,
            } => self.chunk(&input_dir, &text_dir, &output_dir, chunk_size, overlap),
            Commands::Classify { chunk_dir } => self.classify(&chunk_dir).await,
            Commands::Summarize { chunk_dir, style } => self.summarize(&chunk_dir, style).await,
            Commands::Policies { chunk_dir, output } => self.policies(&chunk_dir, &output),
            Commands::Group {
                attribute,
                input,
                output_dir,
            } => {
                let files = crate::ingest::group_by(&attribute, &input, &output_dir)?;
                println!("{} {} groups written to {}", "✓".green(), files.len(), output_dir.display());
                Ok(())
            }
            Commands::Index { kind, collection, input } => self.index(kind, &collection, &input).await,
            Commands::Ask {
                query,
                country,
                year,
                policy_collection,
                knowledge_collection,
            } => {
                self.ask(&query, country.as_deref(), year, &policy_collection, &knowledge_collection)
                    .await
            }
            Commands::Discuss {
                goal,
                countries,
                year,
                stances,
                policy_collection,
                knowledge_collection,
            } => {
                let stances = parse_stances(&stances).map_err(RagError::ConfigError)?;
                self.discuss(&goal, &countries, year, &stances, &policy_collection, &knowledge_collection)
                    .await
            }
            Commands::Config => {
                println!("{}", "Current configuration:".bold());
                println!("{}", self.config.to_toml()?);
                Ok(())
            }
        }
    }

    fn extract(&self, input_dir: &Path, output_dir: &Path) -> Result<()> {
        let pdfs = storage::files_with_extension(input_dir, ".pdf")?;
        for path in pdfs {
            let mut source = PdfSource::new(path);
            source.extract_text()?;
            let saved = source.save_text(output_dir)?;
            println!("{} {}", "✓".green(), saved.display());
        }
        Ok(())
    }

    fn chunk(
        &self,
        input_dir: &Path,
        text_dir: &Path,
        output_dir: &Path,
        chunk_size: Option<usize>,
        overlap: Option<usize>,
    ) -> Result<()> {
        let chunker = SentenceChunker::new(
            chunk_size.unwrap_or(self.config.chunking.chunk_size),
            overlap.unwrap_or(self.config.chunking.overlap),
        );

        for path in storage::files_with_extension(input_dir, ".pdf")? {
            let mut source = PdfSource::new(path);
            source.load_content(&source.output_path(text_dir, "txt"))?;
            let chunks = ChunkSet::from_texts(chunker.split(source.content()));
            let target = source.output_path(output_dir, "json");
            chunks.save(&target)?;
            println!("{} {} chunks -> {}", "✓".green(), chunks.len(), target.display());
        }
        Ok(())
    }

    async fn classify(&self, chunk_dir: &Path) -> Result<()> {
        let model = self.chat_model()?;
        for path in storage::files_with_extension(chunk_dir, ".json")? {
            let mut chunks = ChunkSet::load(&path)?;
            chunks.classify_all(model.as_ref(), &file_label(&path)).await?;
            let dropped = chunks.retain_relevant();
            chunks.save(&path)?;
            println!(
                "{} {}: kept {}, filtered out {}",
                "✓".green(),
                file_label(&path),
                chunks.len(),
                dropped
            );
        }
        Ok(())
    }

    async fn summarize(&self, chunk_dir: &Path, style: SummaryStyle) -> Result<()> {
        let model = self.chat_model()?;
        let kind = match style {
            SummaryStyle::Record => SummaryKind::Record,
            SummaryStyle::Knowledge => SummaryKind::Knowledge,
        };
        for path in storage::files_with_extension(chunk_dir, ".json")? {
            let mut chunks = ChunkSet::load(&path)?;
            chunks.summarize_all(model.as_ref(), kind, &file_label(&path)).await?;
            chunks.save(&path)?;
            println!("{} {} summarized", "✓".green(), file_label(&path));
        }
        Ok(())
    }

    fn policies(&self, chunk_dir: &Path, output: &Path) -> Result<()> {
        let mut written = 0;
        for path in storage::files_with_extension(chunk_dir, ".json")? {
            let label = file_label(&path);
            let chunks = ChunkSet::load(&path)?;
            for (i, chunk) in chunks.chunks.iter().enumerate() {
                if let Some(summary) = &chunk.summary {
                    PolicyRecord::from_summary(format!("{}-{}", label, i), summary).append_to_file(output)?;
                    written += 1;
                }
            }
        }
        println!("{} {} policy records written to {}", "✓".green(), written, output.display());
        Ok(())
    }

    async fn index(&self, kind: IndexKind, collection: &str, input: &Path) -> Result<()> {
        let embedder = self.embedder()?;
        let indexer = Indexer::new(self.store(embedder.clone())?, embedder);
        let target = indexer.create_collection(collection).await?;

        let stored = match kind {
            IndexKind::Chunks => indexer.add_chunks(&target, &load_chunks(input)?).await?,
            IndexKind::Knowledge => indexer.add_knowledge(&target, &load_chunks(input)?).await?,
            IndexKind::Policies => indexer.add_policies(&target, &load_policies(input)?).await?,
        };
        println!("{} {} points stored in {}", "✓".green(), stored, collection.bold());
        Ok(())
    }

    async fn ask(
        &self,
        query: &str,
        country: Option<&str>,
        year: i32,
        policy_collection: &str,
        knowledge_collection: &str,
    ) -> Result<()> {
        let embedder = self.embedder()?;
        let store = self.store(embedder.clone())?;
        let assembler = self.assembler(embedder)?;
        let policies = Collection::new(policy_collection, store.clone());
        let knowledge = Collection::new(knowledge_collection, store);
        let k = self.config.retrieval.k;

        let policy_context = match country {
            Some(country) => {
                assembler
                    .retrieve_country_policies(country, query, &policies, year, k)
                    .await?
            }
            None => assembler.retrieve_policies(query, &policies, k).await?,
        };
        let knowledge_context = assembler.retrieve_knowledge(query, &knowledge, k).await?;

        let model = self.chat_model()?;
        let answer =
            chatbot::answer_with_knowledge(model.as_ref(), query, &policy_context, &knowledge_context).await?;
        println!("{}\n{}", "Answer:".bold().cyan(), answer);
        Ok(())
    }

    async fn discuss(
        &self,
        goal: &str,
        countries: &[String],
        year: i32,
        stances: &std::collections::HashMap<String, String>,
        policy_collection: &str,
        knowledge_collection: &str,
    ) -> Result<()> {
        let embedder = self.embedder()?;
        let store = self.store(embedder.clone())?;
        let assembler = self.assembler(embedder)?;
        let policies = Collection::new(policy_collection, store.clone());
        let knowledge = Collection::new(knowledge_collection, store);

        let discussion = Discussion {
            model: self.chat_model()?,
            assembler: &assembler,
            policies: &policies,
            knowledge: &knowledge,
            settings: &self.config.agents,
        };
        for position in discussion.run(countries, goal, year, stances).await? {
            println!("{}", format!("=== {} ===", position.country).bold().cyan());
            println!("{}\n", position.proposal);
        }
        Ok(())
    }

    fn chat_model(&self) -> Result<Arc<OpenAiClient>> {
        Ok(Arc::new(OpenAiClient::from_settings(&self.config.openai)?))
    }

    fn embedder(&self) -> Result<Arc<dyn EmbeddingProvider>> {
        let dense: Arc<dyn DenseEmbedder> = match self.config.embedding.provider {
            EmbeddingBackend::OpenAi => Arc::new(OpenAiClient::from_settings(&self.config.openai)?),
            EmbeddingBackend::Local => Arc::new(LocalEmbedder::new(&self.config.embedding.local_model)?),
        };
        let sparse = SparseEncoder::from_pretrained(&self.config.embedding.sparse_tokenizer)?;
        Ok(Arc::new(HybridEmbedder::new(dense, sparse)))
    }

    fn store(&self, embedder: Arc<dyn EmbeddingProvider>) -> Result<Arc<dyn VectorStore>> {
        Ok(Arc::new(QdrantStore::connect(&self.config.qdrant, embedder)?))
    }

    fn assembler(&self, embedder: Arc<dyn EmbeddingProvider>) -> Result<ContextAssembler> {
        let assembler = ContextAssembler::new(embedder, self.config.retrieval.clone());
        if self.config.retrieval.use_reranking {
            let reranker = CrossEncoderReranker::new(&self.config.reranker.model)?;
            Ok(assembler.with_reranker(Arc::new(reranker)))
        } else {
            Ok(assembler)
        }
    }
}

fn file_label(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// A JSON file, or every JSON file directly under a directory
fn json_inputs(input: &Path) -> Result<Vec<PathBuf>> {
    if input.is_dir() {
        storage::files_with_extension(input, ".json")
    } else {
        Ok(vec![input.to_path_buf()])
    }
}

fn load_chunks(input: &Path) -> Result<Vec<Chunk>> {
    let mut chunks = Vec::new();
    for path in json_inputs(input)? {
        chunks.extend(ChunkSet::load(&path)?.chunks);
    }
    Ok(chunks)
}

fn load_policies(input: &Path) -> Result<Vec<PolicyRecord>> {
    let mut policies = Vec::new();
    for path in json_inputs(input)? {
        let records: Vec<PolicyRecord> = storage::load_json(&path)?
            .ok_or_else(|| RagError::Generic(format!("No policy file at {}", path.display())))?;
        policies.extend(records);
    }
    Ok(policies)
}
