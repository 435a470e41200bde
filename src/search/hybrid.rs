//! RRF (Reciprocal Rank Fusion) for hybrid search
//!
//! Combines ranked lists from different retrieval paths:
//!
//! ```text
//! RRF(d) = Σ weight_i / (k + rank_i(d))
//! ```
//!
//! Where:
//! - k is a smoothing constant (default 60)
//! - rank_i(d) is the 1-indexed position of d in list i
//! - weight_i is the importance weight for list i
//!
//! Contributions for the same note id sum across lists. Equal totals keep
//! the order in which ids were first seen (earlier lists first).

use std::collections::HashMap;

use crate::search::types::{MatchType, SearchResult};

/// Reciprocal Rank Fusion configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RrfConfig {
    /// Higher values flatten the difference between top and lower ranks.
    pub k: f32,
}

impl Default for RrfConfig {
    fn default() -> Self {
        Self { k: 60.0 }
    }
}

impl RrfConfig {
    #[must_use]
    pub const fn with_k(k: f32) -> Self {
        Self { k }
    }

    /// Contribution of a 1-indexed rank.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn contribution(&self, rank: usize, weight: f32) -> f32 {
        weight / (self.k + rank as f32)
    }
}

/// One ranked list to fuse.
#[derive(Debug, Clone)]
pub struct WeightedList {
    pub results: Vec<SearchResult>,
    pub weight: f32,
}

impl WeightedList {
    #[must_use]
    pub const fn new(results: Vec<SearchResult>, weight: f32) -> Self {
        Self { results, weight }
    }
}

/// Fused score for one note id.
#[derive(Debug, Clone, PartialEq)]
pub struct FusedId {
    pub note_id: String,
    pub score: f32,
    /// 1-indexed rank in each input list, `None` where absent.
    pub ranks: Vec<Option<usize>>,
}

impl FusedId {
    #[must_use]
    pub fn list_count(&self) -> usize {
        self.ranks.iter().filter(|rank| rank.is_some()).count()
    }
}

/// Fuse lists of note ids. Each list is `(ids in rank order, weight)`.
/// A duplicated id within one list only counts at its best rank.
#[must_use]
pub fn fuse_ids(lists: &[(&[String], f32)], config: &RrfConfig) -> Vec<FusedId> {
    let mut order: Vec<FusedId> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();

    for (list_idx, (ids, weight)) in lists.iter().enumerate() {
        for (rank, note_id) in ids.iter().enumerate() {
            let rank = rank + 1;
            let pos = *positions.entry(note_id.as_str()).or_insert_with(|| {
                order.push(FusedId {
                    note_id: note_id.clone(),
                    score: 0.0,
                    ranks: vec![None; lists.len()],
                });
                order.len() - 1
            });

            let fused = &mut order[pos];
            if fused.ranks[list_idx].is_some() {
                continue;
            }
            fused.ranks[list_idx] = Some(rank);
            fused.score += config.contribution(rank, *weight);
        }
    }

    order.sort_by(|a, b| b.score.total_cmp(&a.score));
    order
}

/// Fuse ranked result lists. The fused score replaces each result's score;
/// results found by more than one list become [`MatchType::Hybrid`] and
/// keep the per-path scores of every list they came from.
#[must_use]
pub fn fuse_results(lists: Vec<WeightedList>, config: &RrfConfig) -> Vec<SearchResult> {
    let id_lists: Vec<Vec<String>> = lists
        .iter()
        .map(|list| list.results.iter().map(|r| r.note_id.clone()).collect())
        .collect();
    let weighted: Vec<(&[String], f32)> = id_lists
        .iter()
        .zip(&lists)
        .map(|(ids, list)| (ids.as_slice(), list.weight))
        .collect();
    let fused = fuse_ids(&weighted, config);

    let mut by_id: HashMap<String, SearchResult> = HashMap::new();
    for list in lists {
        for result in list.results {
            match by_id.get_mut(&result.note_id) {
                Some(existing) => merge_into(existing, result),
                None => {
                    by_id.insert(result.note_id.clone(), result);
                }
            }
        }
    }

    fused
        .into_iter()
        .filter_map(|hit| {
            let mut result = by_id.remove(&hit.note_id)?;
            result.score = hit.score;
            if hit.list_count() > 1 {
                result.match_type = MatchType::Hybrid;
            }
            Some(result)
        })
        .collect()
}

fn merge_into(existing: &mut SearchResult, other: SearchResult) {
    if existing.match_type != other.match_type {
        existing.match_type = MatchType::Hybrid;
    }
    existing.lexical_score = existing.lexical_score.or(other.lexical_score);
    existing.semantic_score = existing.semantic_score.or(other.semantic_score);
    for term in other.matched_terms {
        if !existing.matched_terms.contains(&term) {
            existing.matched_terms.push(term);
        }
    }
}
