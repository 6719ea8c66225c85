//! CLI module for climaterag
//!
//! Handles command-line argument parsing and subcommand execution.

pub mod args;
pub mod commands;

pub use args::{parse_stances, Args, Commands, IndexKind, SummaryStyle, Verbosity};
pub use commands::App;
