//! Document ingestion: PDF text, chunks, and policy records

pub mod chunk;
pub mod chunking;
pub mod pdf;
pub mod policy;

use indicatif::{ProgressBar, ProgressStyle};

pub use chunk::{parse_relevance, Chunk, ChunkSet, SummaryKind};
pub use chunking::{estimate_tokens, SentenceChunker};
pub use pdf::PdfSource;
pub use policy::{group_by, PolicyRecord};

/// Bar for a loop over `len` items
pub(crate) fn progress_bar(len: usize, label: &str) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:40.cyan/blue}] {pos}/{len} | ETA: {eta}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
    );
    pb.set_message(label.to_string());
    pb
}
