//! notesift add - Index or update individual notes

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::commands::expand_path;
use crate::cli::output::{HumanLayout, emit_human, emit_json, ok};
use crate::error::Result;
use crate::notes::load_file;

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Markdown files to index
    #[arg(value_name = "FILE", required = true)]
    pub files: Vec<PathBuf>,

    /// Notes root; ids and `in:` paths are relative to it
    #[arg(long)]
    pub root: Option<PathBuf>,
}

#[derive(Serialize)]
struct AddOutput {
    indexed: usize,
    note_ids: Vec<String>,
}

pub fn run(ctx: &AppContext, args: &AddArgs) -> Result<()> {
    let root = args.root.as_deref().map(expand_path);
    let loaded = args
        .files
        .iter()
        .map(|file| load_file(&expand_path(file), root.as_deref()))
        .collect::<Result<Vec<_>>>()?;

    let note_ids: Vec<String> = loaded.iter().map(|n| n.note.id.clone()).collect();
    let pairs: Vec<_> = loaded.into_iter().map(|n| n.into_pair()).collect();
    let indexed = ctx.engine.index_notes(&pairs)?;

    let output = AddOutput { indexed, note_ids };
    if ctx.json() {
        return emit_json(&ok(output));
    }

    let mut layout = HumanLayout::new(ctx.output.use_colors());
    layout.title(&format!("Indexed {} note(s)", output.indexed));
    for id in &output.note_ids {
        layout.push_line(format!("  {id}"));
    }
    emit_human(&layout);
    Ok(())
}
