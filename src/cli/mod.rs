//! CLI module - Command-line interface definitions and handlers
//!
//! Uses clap v4 with derive macros for argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use output::OutputFormat;

pub mod commands;
pub mod output;

/// notesift - hybrid full-text and semantic search over markdown notes
#[derive(Parser, Debug)]
#[command(name = "notesift")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Machine-readable JSON output
    #[arg(long, global = true)]
    pub json: bool,

    /// Output format (human, json, plain)
    #[arg(long, short = 'O', global = true, value_enum)]
    pub output_format: Option<OutputFormat>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress log output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file path (default: <config dir>/notesift/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Index database path (overrides [index] db_path)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    #[must_use]
    pub fn output_format(&self) -> OutputFormat {
        OutputFormat::from_args(self.json, self.output_format)
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Rebuild the index from a directory of markdown notes
    Index(commands::index::IndexArgs),

    /// Index or update individual markdown notes
    Add(commands::add::AddArgs),

    /// Remove a note from the index
    Remove(commands::remove::RemoveArgs),

    /// Search indexed notes
    Search(commands::search::SearchArgs),

    /// Show how a query is parsed and which mode it selects
    Parse(commands::parse::ParseArgs),

    /// Show index statistics
    Stats(commands::stats::StatsArgs),
}
