//! notesift index - Rebuild the index from a notes directory

use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use colored::Colorize;
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::commands::expand_path;
use crate::cli::output::{HumanLayout, emit_human, emit_json, ok};
use crate::error::Result;
use crate::notes::load_dir;
use crate::search::ReindexReport;

#[derive(Args, Debug)]
pub struct IndexArgs {
    /// Directory of markdown notes
    #[arg(value_name = "DIR")]
    pub dir: PathBuf,
}

#[derive(Serialize)]
struct IndexOutput {
    dir: String,
    #[serde(flatten)]
    report: ReindexReport,
    elapsed_ms: u64,
}

pub fn run(ctx: &AppContext, args: &IndexArgs) -> Result<()> {
    let start = Instant::now();
    let dir = expand_path(&args.dir);

    let notes: Vec<_> = load_dir(&dir)?.into_iter().map(|n| n.into_pair()).collect();
    let report = ctx.engine.reindex_all(&notes)?;

    let output = IndexOutput {
        dir: dir.display().to_string(),
        report,
        elapsed_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
    };

    if ctx.json() {
        return emit_json(&ok(output));
    }

    let color = ctx.output.use_colors();
    let mut layout = HumanLayout::new(color);
    let headline = format!("Indexed {} notes from {}", output.report.notes, output.dir);
    layout.title(&if color { headline.green().to_string() } else { headline });
    layout
        .kv("embeddings reused", &output.report.reused_embeddings.to_string())
        .kv("embeddings computed", &output.report.computed_embeddings.to_string());
    if output.report.failed_embeddings > 0 {
        layout.kv("embeddings failed", &output.report.failed_embeddings.to_string());
    }
    layout.kv("elapsed", &format!("{} ms", output.elapsed_ms));
    emit_human(&layout);
    Ok(())
}
