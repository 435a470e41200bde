//! notesift stats - Index statistics

use clap::Args;
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, emit_human, emit_json, ok};
use crate::error::Result;
use crate::search::IndexStats;

#[derive(Args, Debug)]
pub struct StatsArgs {}

#[derive(Serialize)]
struct StatsOutput {
    db_path: String,
    schema_version: u32,
    #[serde(flatten)]
    stats: IndexStats,
}

pub fn run(ctx: &AppContext, _args: &StatsArgs) -> Result<()> {
    let output = StatsOutput {
        db_path: ctx.db_path.display().to_string(),
        schema_version: ctx.db.schema_version(),
        stats: ctx.engine.stats(),
    };

    if ctx.json() {
        return emit_json(&ok(output));
    }

    let mut layout = HumanLayout::new(ctx.output.use_colors());
    layout
        .title("Index")
        .kv("database", &output.db_path)
        .kv("schema version", &output.schema_version.to_string())
        .kv("notes", &output.stats.indexed_notes.to_string())
        .kv("embedded notes", &output.stats.embedded_notes.to_string());
    if let Some(rows) = output.stats.text_index_notes {
        layout.kv("text index rows", &rows.to_string());
    }
    layout.kv("embedder", output.stats.embedder.as_deref().unwrap_or("none"));
    if let Some(dims) = output.stats.dims {
        layout.kv("dims", &dims.to_string());
    }
    emit_human(&layout);
    Ok(())
}
