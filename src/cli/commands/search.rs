//! notesift search - Search indexed notes
//!
//! Mode defaults to auto-detection from the query shape: tag-only queries
//! run tag retrieval, date-only queries run date retrieval, everything else
//! runs hybrid BM25 + semantic search fused with RRF.

use clap::{Args, ValueEnum};
use colored::Colorize;
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::output::{emit_json, ok};
use crate::error::Result;
use crate::search::{
    LinearReranker, ParsedQuery, SearchMode, SearchOptions, SearchResult, detect_search_mode,
    parse, parse_qmd,
};

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Search query (supports tag:, in:, date:, before:, after:, from:, to:)
    pub query: String,

    /// Search mode: auto (default), full-text, semantic, hybrid, tag, date
    #[arg(long, short)]
    pub mode: Option<SearchMode>,

    /// Maximum number of results
    #[arg(long, short)]
    pub limit: Option<usize>,

    /// Results to skip
    #[arg(long, default_value = "0")]
    pub offset: usize,

    /// Snippet length in characters
    #[arg(long)]
    pub snippet_length: Option<usize>,

    /// Include full note content
    #[arg(long)]
    pub content: bool,

    /// Disable the recency boost
    #[arg(long)]
    pub no_recent_boost: bool,

    /// Disable the title boost
    #[arg(long)]
    pub no_title_boost: bool,

    /// Drop near-duplicate results
    #[arg(long)]
    pub diversify: bool,

    /// Parse with the alternate grammar (#tag, [[link]], ^term, -term)
    #[arg(long)]
    pub qmd: bool,

    /// Replace boosted scores with a reranker
    #[arg(long, value_enum)]
    pub rerank: Option<RerankKind>,

    /// Drop semantic hits below this cosine similarity
    #[arg(long)]
    pub min_similarity: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RerankKind {
    /// Weighted sum of per-result ranking features
    Linear,
}

#[derive(Serialize)]
struct SearchOutput<'a> {
    query: &'a ParsedQuery,
    mode: SearchMode,
    count: usize,
    results: &'a [SearchResult],
}

pub fn run(ctx: &AppContext, args: &SearchArgs) -> Result<()> {
    let query = if args.qmd { parse_qmd(&args.query) } else { parse(&args.query) };
    let options = build_options(ctx.engine.default_options(), args);
    let mode = match args.mode.unwrap_or_default() {
        SearchMode::Auto => detect_search_mode(&query),
        explicit => explicit,
    };

    let results = ctx.engine.search_parsed(&query, mode, &options)?;

    if ctx.json() {
        return emit_json(&ok(SearchOutput {
            query: &query,
            mode,
            count: results.len(),
            results: &results,
        }));
    }

    print_human(&args.query, mode, &results, ctx.output.use_colors());
    Ok(())
}

fn build_options(defaults: SearchOptions, args: &SearchArgs) -> SearchOptions {
    let mut options = defaults
        .with_offset(args.offset)
        .with_include_content(args.content)
        .with_diversify(args.diversify);
    if let Some(limit) = args.limit {
        options = options.with_limit(limit);
    }
    if let Some(length) = args.snippet_length {
        options = options.with_snippet_length(length);
    }
    if args.no_recent_boost {
        options = options.with_recent_boost(false);
    }
    if args.no_title_boost {
        options = options.with_title_boost(false);
    }
    if let Some(threshold) = args.min_similarity {
        options = options.with_min_similarity(threshold);
    }
    if args.rerank == Some(RerankKind::Linear) {
        options = options.with_linear_reranker(LinearReranker::default());
    }
    options
}

fn print_human(raw: &str, mode: SearchMode, results: &[SearchResult], color: bool) {
    if results.is_empty() {
        println!("No results for \"{raw}\" ({mode})");
        return;
    }

    let header = format!("{} result(s) for \"{raw}\" ({mode})", results.len());
    println!("{}", if color { header.bold().to_string() } else { header });
    println!();

    for (i, result) in results.iter().enumerate() {
        let title = if color {
            result.title.cyan().bold().to_string()
        } else {
            result.title.clone()
        };
        println!("{:>2}. {title}  [{:.3} {}]", i + 1, result.score, result.match_type);

        let mut meta = vec![result.note_id.clone()];
        if !result.path.is_empty() {
            meta.push(format!("in:{}", result.path));
        }
        if !result.tags.is_empty() {
            meta.push(result.tags.iter().map(|t| format!("#{t}")).collect::<Vec<_>>().join(" "));
        }
        meta.push(result.updated_at.format("%Y-%m-%d").to_string());
        let meta = meta.join("  ");
        println!("    {}", if color { meta.dimmed().to_string() } else { meta });

        let snippet = result.snippet.replace('\n', " ");
        if !snippet.trim().is_empty() {
            println!("    {}", snippet.trim());
        }
        if let Some(content) = &result.content {
            println!();
            for line in content.lines() {
                println!("    {line}");
            }
        }
        println!();
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::cli::{Cli, Commands};

    fn args(argv: &[&str]) -> SearchArgs {
        let mut full = vec!["notesift", "search"];
        full.extend_from_slice(argv);
        match Cli::parse_from(full).command {
            Commands::Search(args) => args,
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn flags_map_to_options() {
        let args = args(&[
            "rust",
            "--limit",
            "5",
            "--offset",
            "2",
            "--no-recent-boost",
            "--content",
            "--diversify",
            "--rerank",
            "linear",
        ]);
        let options = build_options(SearchOptions::default(), &args);
        assert_eq!(options.limit, 5);
        assert_eq!(options.offset, 2);
        assert!(!options.boost_recent);
        assert!(options.boost_title);
        assert!(options.include_content);
        assert!(options.diversify);
        assert!(options.linear_reranker.is_some());
    }

    #[test]
    fn defaults_keep_configured_options() {
        let defaults = SearchOptions::default().with_limit(7);
        let options = build_options(defaults, &args(&["rust"]));
        assert_eq!(options.limit, 7);
        assert!(options.linear_reranker.is_none());
        assert!(!options.diversify);
    }
}
