//! notesift remove - Remove a note from the index

use clap::Args;

use crate::app::AppContext;
use crate::cli::output::{emit_json, ok};
use crate::error::{Result, SearchError};

#[derive(Args, Debug)]
pub struct RemoveArgs {
    /// Note id (as shown by `search`)
    pub note_id: String,
}

pub fn run(ctx: &AppContext, args: &RemoveArgs) -> Result<()> {
    if !ctx.engine.remove_from_index(&args.note_id)? {
        return Err(SearchError::NotFound(args.note_id.clone()));
    }

    if ctx.json() {
        emit_json(&ok(serde_json::json!({ "removed": args.note_id })))
    } else {
        println!("Removed {}", args.note_id);
        Ok(())
    }
}
