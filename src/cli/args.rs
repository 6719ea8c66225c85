//! Command-line argument parsing for climaterag
//!
//! Provides clap-based CLI with one subcommand per pipeline stage.

use clap::{Parser, Subcommand, ValueEnum};
use std::collections::HashMap;
use std::path::PathBuf;

/// climaterag - Retrieval-augmented answers over climate policy documents
#[derive(Parser, Debug)]
#[command(name = "climaterag")]
#[command(version)]
#[command(about = "Extract, index and query climate policies with retrieval-augmented generation", long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbosity level: -q (quiet), default (normal), -v (verbose), -vv (very verbose)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (warnings and errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract text from every PDF in a directory
    Extract {
        #[arg(value_name = "PDF_DIR")]
        input_dir: PathBuf,
        /// Directory for the extracted .txt files
        #[arg(short, long, default_value = "output/text")]
        output_dir: PathBuf,
    },

    /// Split extracted PDFs into sentence chunks
    Chunk {
        #[arg(value_name = "PDF_DIR")]
        input_dir: PathBuf,
        /// Directory holding the extracted .txt files
        #[arg(long, default_value = "output/text")]
        text_dir: PathBuf,
        /// Directory for the chunk .json files
        #[arg(short, long, default_value = "output/chunks")]
        output_dir: PathBuf,
        /// Chunk size in estimated tokens (overrides config)
        #[arg(long)]
        chunk_size: Option<usize>,
        /// Overlap in estimated tokens (overrides config)
        #[arg(long)]
        overlap: Option<usize>,
    },

    /// Classify chunks for climate-policy relevance and drop the rest
    Classify {
        #[arg(value_name = "CHUNK_DIR")]
        chunk_dir: PathBuf,
    },

    /// Summarize chunks as policy records or knowledge
    Summarize {
        #[arg(value_name = "CHUNK_DIR")]
        chunk_dir: PathBuf,
        #[arg(short, long, value_enum, default_value_t = SummaryStyle::Record)]
        style: SummaryStyle,
    },

    /// Parse summarized chunks into a policy record file
    Policies {
        #[arg(value_name = "CHUNK_DIR")]
        chunk_dir: PathBuf,
        /// JSON array file the records are appended to
        #[arg(short, long, default_value = "output/policies.json")]
        output: PathBuf,
    },

    /// Split a record file into one file per attribute value
    Group {
        /// Attribute to group by (e.g. country)
        #[arg(short, long, default_value = "country")]
        attribute: String,
        #[arg(value_name = "INPUT")]
        input: PathBuf,
        #[arg(short, long, default_value = "output/grouped")]
        output_dir: PathBuf,
    },

    /// Embed records into a fresh vector collection
    Index {
        #[arg(value_enum)]
        kind: IndexKind,
        /// Collection name
        #[arg(long)]
        collection: String,
        /// JSON file, or directory of JSON files
        #[arg(value_name = "INPUT")]
        input: PathBuf,
    },

    /// Answer a question from indexed policies and knowledge
    Ask {
        #[arg(value_name = "QUESTION")]
        query: String,
        /// Restrict policy context to one country
        #[arg(long)]
        country: Option<String>,
        /// Earliest policy year when --country is set
        #[arg(long, default_value_t = 2000)]
        year: i32,
        #[arg(long, default_value = "policies")]
        policy_collection: String,
        #[arg(long, default_value = "knowledge")]
        knowledge_collection: String,
    },

    /// Run a multi-country policy discussion
    Discuss {
        /// Shared goal all countries negotiate towards
        #[arg(value_name = "GOAL")]
        goal: String,
        /// Participating countries, comma separated
        #[arg(long, value_delimiter = ',', required = true)]
        countries: Vec<String>,
        /// Earliest policy year each country draws on
        #[arg(long, default_value_t = 2015)]
        year: i32,
        /// Country stance as COUNTRY=STANCE (repeatable)
        #[arg(long = "stance", value_name = "COUNTRY=STANCE")]
        stances: Vec<String>,
        #[arg(long, default_value = "policies")]
        policy_collection: String,
        #[arg(long, default_value = "knowledge")]
        knowledge_collection: String,
    },

    /// Display current configuration
    Config,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SummaryStyle {
    Record,
    Knowledge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum IndexKind {
    Chunks,
    Policies,
    Knowledge,
}

/// Verbosity level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    VeryVerbose,
}

impl Args {
    /// Get verbosity level based on flags
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::VeryVerbose,
            }
        }
    }
}

impl Verbosity {
    /// Default tracing filter directive
    pub fn filter_directive(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "warn",
            Verbosity::Normal => "info",
            Verbosity::Verbose => "debug",
            Verbosity::VeryVerbose => "trace",
        }
    }
}

/// Parse `COUNTRY=STANCE` pairs; entries without `=` are rejected
pub fn parse_stances(pairs: &[String]) -> Result<HashMap<String, String>, String> {
    pairs
        .iter()
        .map(|pair| {
            pair.split_once('=')
                .map(|(country, stance)| (country.trim().to_string(), stance.trim().to_string()))
                .filter(|(country, _)| !country.is_empty())
                .ok_or_else(|| format!("Invalid stance '{}', expected COUNTRY=STANCE", pair))
        })
        .collect()
}
