//! Reranking
//!
//! Boosts are added to the incoming score (RRF or raw path score), each
//! behind its own toggle in [`SearchOptions`]. Sorting is stable: results
//! with equal boosted scores keep their retrieval order.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::RankingConfig;
use crate::search::query::ParsedQuery;
use crate::search::types::{SearchOptions, SearchResult};

/// Additive boost reranker.
#[derive(Debug, Clone)]
pub struct BoostReranker {
    config: RankingConfig,
}

impl BoostReranker {
    #[must_use]
    pub const fn new(config: RankingConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &RankingConfig {
        &self.config
    }

    /// Boost and re-sort. Never adds or drops a result.
    #[must_use]
    pub fn apply(
        &self,
        mut results: Vec<SearchResult>,
        query: &ParsedQuery,
        options: &SearchOptions,
        now: DateTime<Utc>,
    ) -> Vec<SearchResult> {
        let query_tags: HashSet<String> = query.tags.iter().map(|t| t.to_lowercase()).collect();

        for result in &mut results {
            let mut boost = 0.0;
            if options.boost_title {
                boost += self.title_boost(result, query) * options.title_weight;
            }
            if options.boost_recent {
                boost += self.recency_boost(result.updated_at, now);
            }
            if options.boost_tags {
                boost += self.tag_boost(result, &query_tags);
            }
            if options.boost_exact_phrase {
                boost += self.phrase_boost(result, query);
            }
            result.score += boost;
        }

        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results
    }

    /// `title_boost` when any term is a substring of the title, plus
    /// `exact_boost` when a term longer than three characters equals it.
    #[must_use]
    pub fn title_boost(&self, result: &SearchResult, query: &ParsedQuery) -> f32 {
        let title = result.title.to_lowercase();
        let mut boost = 0.0;

        if query
            .term_texts()
            .any(|term| !term.is_empty() && title.contains(&term.to_lowercase()))
        {
            boost += self.config.title_boost;
        }
        if query
            .term_texts()
            .any(|term| term.chars().count() > 3 && term.to_lowercase() == title)
        {
            boost += self.config.exact_boost;
        }
        boost
    }

    /// `recent_boost * decay_factor^months`, with months = days / 30.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn recency_boost(&self, updated_at: DateTime<Utc>, now: DateTime<Utc>) -> f32 {
        let days = (now - updated_at).num_seconds().max(0) as f32 / 86_400.0;
        let months = days / 30.0;
        self.config.recent_boost * self.config.decay_factor.powf(months)
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn tag_boost(&self, result: &SearchResult, query_tags: &HashSet<String>) -> f32 {
        if query_tags.is_empty() {
            return 0.0;
        }
        let matching = result
            .tags
            .iter()
            .map(|tag| tag.to_lowercase())
            .collect::<HashSet<_>>()
            .intersection(query_tags)
            .count();
        self.config.tag_boost * matching as f32
    }

    /// `exact_boost` when any quoted phrase appears in the title or content.
    #[must_use]
    pub fn phrase_boost(&self, result: &SearchResult, query: &ParsedQuery) -> f32 {
        let title = result.title.to_lowercase();
        let content = result.content_text().to_lowercase();
        let hit = query.phrases().any(|phrase| {
            let phrase = phrase.to_lowercase();
            title.contains(&phrase) || content.contains(&phrase)
        });
        if hit { self.config.exact_boost } else { 0.0 }
    }

    /// Drop near-duplicates. A result is skipped when the Jaccard
    /// similarity of its key terms to any accepted result exceeds the
    /// threshold. The first result is always kept, and at most
    /// [`Self::diversity_cap`] results are accepted.
    #[must_use]
    pub fn diversify(&self, results: Vec<SearchResult>) -> Vec<SearchResult> {
        self.diversify_up_to(results, self.diversity_cap())
    }

    /// Results accepted by one diversification pass.
    #[must_use]
    pub fn diversity_cap(&self) -> usize {
        self.config.diversity_max_results.max(1)
    }

    /// [`Self::diversify`] with an explicit cap on accepted results.
    #[must_use]
    pub fn diversify_up_to(&self, results: Vec<SearchResult>, max: usize) -> Vec<SearchResult> {
        let mut accepted: Vec<SearchResult> = Vec::new();
        let mut accepted_terms: Vec<HashSet<String>> = Vec::new();

        for result in results {
            if accepted.len() >= max.max(1) {
                break;
            }
            let terms = key_terms(result.title.as_str(), result.content_text(), self.config.diversity_key_terms);
            let too_similar = accepted_terms
                .iter()
                .any(|seen| jaccard(&terms, seen) > self.config.diversity_threshold);
            if too_similar {
                continue;
            }
            accepted_terms.push(terms);
            accepted.push(result);
        }
        accepted
    }
}

/// Up to `max` distinct lowercase words longer than four characters.
#[must_use]
pub fn key_terms(title: &str, content: &str, max: usize) -> HashSet<String> {
    let mut out = HashSet::new();
    let text = format!("{title} {content}").to_lowercase();
    for word in text.split(|c: char| !c.is_alphanumeric()) {
        if out.len() >= max {
            break;
        }
        if word.chars().count() > 4 {
            out.insert(word.to_string());
        }
    }
    out
}

#[allow(clippy::cast_precision_loss)]
fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f32 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f32 / union as f32
}

/// Per-result features for the linear reranker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingFeatures {
    pub lexical_score: f32,
    pub semantic_score: f32,
    pub title_match: bool,
    pub tag_match_count: usize,
    pub days_since_update: f32,
    pub content_length: usize,
    pub match_count: usize,
}

impl RankingFeatures {
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn extract(result: &SearchResult, query: &ParsedQuery, now: DateTime<Utc>) -> Self {
        let title = result.title.to_lowercase();
        let result_tags: HashSet<String> = result.tags.iter().map(|t| t.to_lowercase()).collect();

        Self {
            lexical_score: result.lexical_score.unwrap_or(0.0),
            semantic_score: result.semantic_score.unwrap_or(0.0),
            title_match: query
                .term_texts()
                .any(|term| !term.is_empty() && title.contains(&term.to_lowercase())),
            tag_match_count: query
                .tags
                .iter()
                .filter(|tag| result_tags.contains(&tag.to_lowercase()))
                .count(),
            days_since_update: (now - result.updated_at).num_seconds().max(0) as f32 / 86_400.0,
            content_length: result.content_text().chars().count(),
            match_count: result.matched_terms.len(),
        }
    }
}

/// Weighted sum over [`RankingFeatures`]. Content length enters as
/// `ln(1 + chars)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearReranker {
    pub lexical: f32,
    pub semantic: f32,
    pub title_match: f32,
    pub tag_match: f32,
    pub days_since_update: f32,
    pub content_length: f32,
    pub match_count: f32,
}

impl Default for LinearReranker {
    fn default() -> Self {
        Self {
            lexical: 1.0,
            semantic: 1.0,
            title_match: 0.5,
            tag_match: 0.3,
            days_since_update: -0.01,
            content_length: 0.05,
            match_count: 0.2,
        }
    }
}

impl LinearReranker {
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn score(&self, features: &RankingFeatures) -> f32 {
        self.lexical * features.lexical_score
            + self.semantic * features.semantic_score
            + if features.title_match { self.title_match } else { 0.0 }
            + self.tag_match * features.tag_match_count as f32
            + self.days_since_update * features.days_since_update
            + self.content_length * (features.content_length as f32).ln_1p()
            + self.match_count * features.match_count as f32
    }

    /// Replace each score with the linear score and re-sort (stable).
    #[must_use]
    pub fn rerank(
        &self,
        mut results: Vec<SearchResult>,
        query: &ParsedQuery,
        now: DateTime<Utc>,
    ) -> Vec<SearchResult> {
        for result in &mut results {
            result.score = self.score(&RankingFeatures::extract(result, query, now));
        }
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::search::query::parse;
    use crate::search::types::{MatchType, Note, NoteIndexEntry};

    fn result(id: &str, title: &str, content: &str, tags: &[&str], age_days: i64) -> SearchResult {
        let note = Note::new(id, title, content)
            .with_tags(tags.iter().copied())
            .with_updated_at(Utc::now() - Duration::days(age_days));
        let entry = NoteIndexEntry::from_note(&note, "", None);
        SearchResult::from_entry(&entry, 0.0, MatchType::FullText, String::new(), vec![])
    }

    fn only(options: SearchOptions, toggle: &str) -> SearchOptions {
        options
            .with_title_boost(toggle == "title")
            .with_recent_boost(toggle == "recent")
            .with_tag_boost(toggle == "tags")
            .with_exact_phrase_boost(toggle == "phrase")
    }

    fn reranker() -> BoostReranker {
        BoostReranker::new(RankingConfig::default())
    }

    // =========================================================================
    // Individual boosts
    // =========================================================================

    #[test]
    fn recency_at_zero_months_is_full_boost() {
        let now = Utc::now();
        assert_eq!(reranker().recency_boost(now, now), 1.5);
    }

    #[test]
    fn recency_decays_per_month() {
        let now = Utc::now();
        let boost = reranker().recency_boost(now - Duration::days(30), now);
        assert!((boost - 1.5 * 0.9).abs() < 1e-5);
        let future = reranker().recency_boost(now + Duration::days(3), now);
        assert_eq!(future, 1.5);
    }

    #[test]
    fn title_substring_and_exact_match() {
        let r = result("a", "Swift", "", &[], 0);
        assert_eq!(reranker().title_boost(&r, &parse("swi")), 2.0);
        assert_eq!(reranker().title_boost(&r, &parse("SWIFT")), 5.0);
        assert_eq!(reranker().title_boost(&r, &parse("kotlin")), 0.0);

        let short = result("b", "Go", "", &[], 0);
        assert_eq!(reranker().title_boost(&short, &parse("go")), 2.0);
    }

    #[test]
    fn tag_boost_counts_intersection() {
        let r = result("a", "T", "", &["Swift", "ios", "mobile"], 0);
        let tags: HashSet<String> = ["swift", "ios", "rust"].iter().map(|s| (*s).to_string()).collect();
        assert!((reranker().tag_boost(&r, &tags) - 3.6).abs() < 1e-5);
    }

    #[test]
    fn phrase_boost_checks_title_and_content() {
        let r = result("a", "Notes", "the quick brown fox", &[], 0);
        assert_eq!(reranker().phrase_boost(&r, &parse(r#""Quick Brown""#)), 3.0);
        assert_eq!(reranker().phrase_boost(&r, &parse(r#""brown quick""#)), 0.0);
        assert_eq!(reranker().phrase_boost(&r, &parse("quick brown")), 0.0);
    }

    // =========================================================================
    // Pipeline
    // =========================================================================

    #[test]
    fn boosts_are_additive_and_toggleable() {
        let results = vec![result("a", "Swift Basics", "", &["swift"], 0)];
        let query = parse("basics tag:swift");
        let now = Utc::now();

        let none = reranker().apply(results.clone(), &query, &only(SearchOptions::default(), ""), now);
        assert_eq!(none[0].score, 0.0);

        let title = reranker().apply(results.clone(), &query, &only(SearchOptions::default(), "title"), now);
        assert_eq!(title[0].score, 2.0);

        let tags = reranker().apply(results, &query, &only(SearchOptions::default(), "tags"), now);
        assert!((tags[0].score - 1.8).abs() < 1e-5);
    }

    #[test]
    fn title_weight_scales_title_boost() {
        let results = vec![result("a", "Swift", "", &[], 0)];
        let options = only(SearchOptions::default(), "title").with_weights(0.5, 1.0, 1.0);
        let out = reranker().apply(results, &parse("swi"), &options, Utc::now());
        assert_eq!(out[0].score, 1.0);
    }

    #[test]
    fn tag_boost_reorders() {
        let results = vec![
            result("b", "Rust Basics", "", &["rust"], 30),
            result("a", "Swift Basics", "", &["swift"], 0),
        ];
        let out = reranker().apply(results, &parse("basics tag:swift"), &SearchOptions::default(), Utc::now());
        assert_eq!(out[0].note_id, "a");
        assert!(out[0].score > out[1].score);
    }

    #[test]
    fn equal_scores_keep_order() {
        let results = vec![result("x", "A", "", &[], 0), result("y", "B", "", &[], 0)];
        let out = reranker().apply(results, &parse("zzz"), &only(SearchOptions::default(), ""), Utc::now());
        let ids: Vec<_> = out.iter().map(|r| r.note_id.as_str()).collect();
        assert_eq!(ids, vec!["x", "y"]);
    }

    // =========================================================================
    // Diversification
    // =========================================================================

    #[test]
    fn diversify_drops_near_duplicates() {
        let body = "ownership borrowing lifetimes traits generics";
        let results = vec![
            result("a", "Rust notes", body, &[], 0),
            result("b", "Rust notes", body, &[], 0),
            result("c", "Bread", "sourdough hydration starter flour", &[], 0),
        ];
        let out = reranker().diversify(results);
        let ids: Vec<_> = out.iter().map(|r| r.note_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn diversify_stops_at_max_results() {
        let results: Vec<_> = (0..30)
            .map(|i| result(&format!("n{i}"), &format!("unique{i}"), &format!("word{i}xx"), &[], 0))
            .collect();
        assert_eq!(reranker().diversify(results.clone()).len(), 20);
        assert_eq!(reranker().diversify_up_to(results, 25).len(), 25);
    }

    #[test]
    fn key_terms_limits_and_filters() {
        let terms = key_terms("Short longer", "words tiny a elephant", 2);
        assert_eq!(terms.len(), 2);
        assert!(terms.contains("short"));
        assert!(terms.contains("longer"));
    }

    // =========================================================================
    // Linear reranker
    // =========================================================================

    #[test]
    fn features_extracted_from_result() {
        let mut r = result("a", "Swift Basics", "hello world", &["swift"], 2);
        r.lexical_score = Some(4.0);
        r.matched_terms = vec!["swift".into()];
        let features = RankingFeatures::extract(&r, &parse("swift tag:swift"), Utc::now());

        assert_eq!(features.lexical_score, 4.0);
        assert_eq!(features.semantic_score, 0.0);
        assert!(features.title_match);
        assert_eq!(features.tag_match_count, 1);
        assert!((features.days_since_update - 2.0).abs() < 0.01);
        assert_eq!(features.content_length, 11);
        assert_eq!(features.match_count, 1);
    }

    #[test]
    fn linear_rerank_prefers_stronger_features() {
        let mut weak = result("weak", "Other", "", &[], 0);
        weak.lexical_score = Some(0.5);
        let mut strong = result("strong", "Swift", "", &[], 0);
        strong.lexical_score = Some(3.0);

        let out = LinearReranker::default().rerank(vec![weak, strong], &parse("swift"), Utc::now());
        assert_eq!(out[0].note_id, "strong");
    }
}
