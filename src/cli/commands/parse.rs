//! notesift parse - Show how a query is parsed
//!
//! Needs no index, so it runs without an [`AppContext`](crate::app::AppContext).

use clap::Args;
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::cli::output::{HumanLayout, emit_human, emit_json, ok};
use crate::error::Result;
use crate::search::{ParsedQuery, SearchMode, detect_search_mode, parse, parse_qmd};

#[derive(Args, Debug)]
pub struct ParseArgs {
    /// Query to parse
    pub query: String,

    /// Use the alternate grammar (#tag, [[link]], ^term, -term)
    #[arg(long)]
    pub qmd: bool,
}

#[derive(Serialize)]
struct ParseOutput {
    mode: SearchMode,
    empty: bool,
    #[serde(flatten)]
    query: ParsedQuery,
}

pub fn run(output: OutputFormat, args: &ParseArgs) -> Result<()> {
    let query = if args.qmd { parse_qmd(&args.query) } else { parse(&args.query) };
    let result = ParseOutput {
        mode: detect_search_mode(&query),
        empty: query.is_empty(),
        query,
    };

    if output.is_machine_readable() {
        return emit_json(&ok(result));
    }

    let q = &result.query;

    let mut layout = HumanLayout::new(output.use_colors());
    layout.title(&format!("Query: {}", q.raw));
    layout
        .kv("mode", result.mode.as_str())
        .kv("terms", &join(q.terms.iter().map(ToString::to_string)))
        .kv("tags", &join(q.tags.iter().cloned()))
        .kv("paths", &join(q.paths.iter().cloned()));
    if let Some(range) = &q.date_range {
        let bound = |d: Option<chrono::DateTime<chrono::Utc>>| {
            d.map_or_else(|| "-".to_string(), |d| d.format("%Y-%m-%d").to_string())
        };
        layout.kv(
            "date",
            &format!("{:?} {} .. {}", range.modifier, bound(range.start), bound(range.end)),
        );
    }
    if !q.links.is_empty() {
        layout.kv("links", &q.links.join(", "));
    }
    if !q.auxiliary_terms.is_empty() {
        layout.kv("auxiliary", &q.auxiliary_terms.join(", "));
    }
    if result.empty {
        layout.blank().push_line("(empty query: search returns no results)");
    }
    emit_human(&layout);
    Ok(())
}

fn join(items: impl Iterator<Item = String>) -> String {
    items.collect::<Vec<_>>().join(", ")
}
