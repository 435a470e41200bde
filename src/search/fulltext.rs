//! Full-text retrieval over the persistent BM25 index.

use tracing::debug;

use crate::error::{Result, SearchError};
use crate::search::filters::PathFilter;
use crate::search::query::{ParsedQuery, PlainTerm};
use crate::search::types::{MatchType, NoteIndexEntry, SearchOptions, SearchResult};
use crate::storage::TextIndex;

/// Build an FTS5 match expression from plain terms: words become prefix
/// matches, phrases become quoted phrase matches, and all terms must
/// match. Returns `None` when nothing searchable remains, which matches
/// every note.
#[must_use]
pub fn build_match_expression(terms: &[PlainTerm]) -> Option<String> {
    let parts: Vec<String> = terms
        .iter()
        .filter(|term| term.text().chars().any(char::is_alphanumeric))
        .map(|term| match term {
            PlainTerm::Word(word) => format!("{}*", quote_fts(word)),
            PlainTerm::Phrase(phrase) => quote_fts(phrase),
        })
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

fn quote_fts(text: &str) -> String {
    format!("\"{}\"", text.replace('"', "\"\""))
}

/// Excerpt around the first term (in query order) found in `content`.
///
/// Matching is case-insensitive and character based. The window starts
/// half a snippet before the match, clamped to the start of the content,
/// and gets a trailing `...` when content remains after it. Without a
/// match the snippet is the leading `length` characters.
#[must_use]
pub fn generate_snippet<'a, I>(content: &str, terms: I, length: usize) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let chars: Vec<char> = content.chars().collect();
    let folded: Vec<char> = chars.iter().map(|c| fold_char(*c)).collect();

    let hit = terms
        .into_iter()
        .filter(|term| !term.is_empty())
        .find_map(|term| {
            let needle: Vec<char> = term.chars().map(fold_char).collect();
            find_chars(&folded, &needle)
        });

    let Some(index) = hit else {
        return chars.iter().take(length).collect();
    };

    let start = index.saturating_sub(length / 2);
    let end = (start + length).min(chars.len());
    let mut snippet: String = chars[start..end].iter().collect();
    if end < chars.len() {
        snippet.push_str("...");
    }
    snippet
}

fn fold_char(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

fn find_chars(haystack: &[char], needle: &[char]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Query terms that occur (case-insensitively) in the title or content.
#[must_use]
pub fn matched_terms(entry: &NoteIndexEntry, query: &ParsedQuery) -> Vec<String> {
    let title = entry.title.to_lowercase();
    let content = entry.content.to_lowercase();
    let mut matched: Vec<String> = Vec::new();
    for term in query.term_texts() {
        let lowered = term.to_lowercase();
        if lowered.is_empty() || matched.iter().any(|m| m.eq_ignore_ascii_case(term)) {
            continue;
        }
        if title.contains(&lowered) || content.contains(&lowered) {
            matched.push(term.to_string());
        }
    }
    matched
}

/// Build a result for `entry` with snippet and matched terms filled in.
#[must_use]
pub fn result_for_entry(
    entry: &NoteIndexEntry,
    query: &ParsedQuery,
    options: &SearchOptions,
    score: f32,
    match_type: MatchType,
) -> SearchResult {
    let snippet = generate_snippet(&entry.content, query.term_texts(), options.snippet_length);
    SearchResult::from_entry(entry, score, match_type, snippet, matched_terms(entry, query))
}

/// Run BM25 retrieval scoped to the query's `in:` paths. Scores are
/// non-negative, higher is better.
pub fn search_full_text(
    index: &dyn TextIndex,
    query: &ParsedQuery,
    options: &SearchOptions,
    limit: usize,
    offset: usize,
) -> Result<Vec<SearchResult>> {
    let expr = build_match_expression(&query.terms);
    let paths = PathFilter::from_query(query);
    debug!(expr = ?expr, paths = paths.prefixes().len(), limit, offset, "full-text search");

    let hits = index
        .search_fts(expr.as_deref(), options.title_weight, &paths, limit, offset)
        .map_err(|err| err.for_path(SearchError::FullTextFailed))?;

    Ok(hits
        .into_iter()
        .map(|hit| {
            let mut result =
                result_for_entry(&hit.entry, query, options, hit.score, MatchType::FullText);
            result.lexical_score = Some(hit.score);
            result
        })
        .collect())
}
