//! Semantic retrieval: cosine similarity against every indexed note.
//!
//! This is a linear scan, O(notes × dims) per query. That is fine for a
//! personal corpus of a few thousand notes; larger corpora would want an
//! ANN index in front of it.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::error::{Result, SearchError};
use crate::search::embeddings::{Embedder, cosine_similarity};
use crate::search::filters::PathFilter;
use crate::search::fulltext::result_for_entry;
use crate::search::query::ParsedQuery;
use crate::search::types::{MatchType, NoteIndexEntry, SearchOptions, SearchResult};

/// Score every entry against the embedded query text.
///
/// Only entries under the query's `in:` paths are scored. Entries without
/// an embedding (or with a different dimensionality) score 0 and are still
/// ranked. Ties keep note-id order so repeated searches return the same
/// list.
pub fn search_semantic(
    entries: &HashMap<String, Arc<NoteIndexEntry>>,
    embedder: Option<&dyn Embedder>,
    query: &ParsedQuery,
    options: &SearchOptions,
    limit: usize,
    offset: usize,
) -> Result<Vec<SearchResult>> {
    let embedder = embedder.ok_or(SearchError::EmbeddingNotAvailable)?;
    let query_vector = embedder.embed(&query.embedding_text())?;
    let paths = PathFilter::from_query(query);

    let mut scored: Vec<(&NoteIndexEntry, f32)> = entries
        .values()
        .filter(|entry| paths.matches(&entry.path))
        .map(|entry| {
            let score = entry
                .embedding
                .as_deref()
                .map_or(0.0, |embedding| cosine_similarity(&query_vector, embedding));
            (entry.as_ref(), score)
        })
        .filter(|(_, score)| options.min_similarity.is_none_or(|min| *score >= min))
        .collect();

    scored.sort_by(|a, b| {
        b.1.total_cmp(&a.1)
            .then_with(|| a.0.note_id.cmp(&b.0.note_id))
    });

    debug!(candidates = scored.len(), dims = query_vector.len(), "semantic scan");

    Ok(scored
        .into_iter()
        .skip(offset)
        .take(limit)
        .map(|(entry, score)| {
            let mut result = result_for_entry(entry, query, options, score, MatchType::Semantic);
            result.semantic_score = Some(score);
            result
        })
        .collect())
}
