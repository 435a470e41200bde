//! CLI command implementations
//!
//! Each subcommand has its own module with:
//! - Args struct for command-line arguments
//! - `run()` function to execute the command

use std::path::{Path, PathBuf};

use crate::app::AppContext;
use crate::cli::Commands;
use crate::error::Result;

pub mod add;
pub mod index;
pub mod parse;
pub mod remove;
pub mod search;
pub mod stats;

/// Dispatch a command to its handler
pub fn run(ctx: &AppContext, command: &Commands) -> Result<()> {
    match command {
        Commands::Index(args) => index::run(ctx, args),
        Commands::Add(args) => add::run(ctx, args),
        Commands::Remove(args) => remove::run(ctx, args),
        Commands::Search(args) => search::run(ctx, args),
        Commands::Parse(args) => parse::run(ctx.output, args),
        Commands::Stats(args) => stats::run(ctx, args),
    }
}

/// Expand a leading `~` to the home directory.
pub(crate) fn expand_path(input: &Path) -> PathBuf {
    let Some(raw) = input.to_str() else {
        return input.to_path_buf();
    };
    if raw == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    if let Some(stripped) = raw.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    input.to_path_buf()
}
