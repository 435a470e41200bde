//! Core search types: notes coming in, results going out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

use crate::config::SearchConfig;
use crate::search::rerank::LinearReranker;

/// A note as supplied by the note store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Note {
    pub fn new(id: impl Into<String>, title: impl Into<String>, content: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            title: title.into(),
            content: content.into(),
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub const fn with_updated_at(mut self, updated_at: DateTime<Utc>) -> Self {
        self.updated_at = updated_at;
        self
    }

    #[must_use]
    pub const fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Text handed to the embedding provider for this note.
    #[must_use]
    pub fn embedding_text(&self) -> String {
        format!("{}\n{}", self.title, self.content)
    }
}

/// Index-facing projection of a note.
///
/// Replaced wholesale on every `index_note`; the note store keeps the
/// canonical record.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteIndexEntry {
    pub note_id: String,
    pub title: String,
    pub content: String,
    /// Lower-cased, punctuation-stripped tokens longer than two characters.
    pub tokens: Vec<String>,
    pub tags: Vec<String>,
    pub path: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub embedding: Option<Vec<f32>>,
}

impl NoteIndexEntry {
    pub fn from_note(note: &Note, path: &str, embedding: Option<Vec<f32>>) -> Self {
        Self {
            note_id: note.id.clone(),
            title: note.title.clone(),
            content: note.content.clone(),
            tokens: tokenize(&format!("{} {}", note.title, note.content)),
            tags: note.tags.clone(),
            path: path.to_string(),
            created_at: note.created_at,
            updated_at: note.updated_at,
            embedding,
        }
    }

    /// Stable hash of the embedded text, used to skip re-embedding
    /// unchanged notes.
    #[must_use]
    pub fn content_hash(&self) -> String {
        content_hash(&self.title, &self.content)
    }
}

pub fn content_hash(title: &str, content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(title.as_bytes());
    hasher.update(b"\n");
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// Split text into index tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    let normalized: String = text.nfkc().collect::<String>().to_lowercase();
    normalized
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.chars().count() > 2)
        .map(str::to_string)
        .collect()
}

/// Which retrieval path produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchType {
    FullText,
    Semantic,
    Hybrid,
    Tag,
    Date,
}

impl MatchType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::FullText => "fullText",
            Self::Semantic => "semantic",
            Self::Hybrid => "hybrid",
            Self::Tag => "tag",
            Self::Date => "date",
        }
    }
}

impl std::fmt::Display for MatchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One ranked hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Fresh per query; not stable across searches.
    pub id: Uuid,
    pub note_id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub snippet: String,
    pub score: f32,
    pub match_type: MatchType,
    pub matched_terms: Vec<String>,
    pub updated_at: DateTime<Utc>,
    pub tags: Vec<String>,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lexical_score: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semantic_score: Option<f32>,
}

impl SearchResult {
    /// Build a result from an index entry. Content is always carried here
    /// and stripped at the end of the pipeline unless requested.
    pub fn from_entry(
        entry: &NoteIndexEntry,
        score: f32,
        match_type: MatchType,
        snippet: String,
        matched_terms: Vec<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            note_id: entry.note_id.clone(),
            title: entry.title.clone(),
            content: Some(entry.content.clone()),
            snippet,
            score,
            match_type,
            matched_terms,
            updated_at: entry.updated_at,
            tags: entry.tags.clone(),
            path: entry.path.clone(),
            lexical_score: None,
            semantic_score: None,
        }
    }

    /// Content for scoring; empty once stripped.
    #[must_use]
    pub fn content_text(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }
}

impl PartialEq for SearchResult {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.note_id == other.note_id
    }
}

impl Eq for SearchResult {}

/// Per-request search configuration. Built once, never mutated by the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    pub limit: usize,
    pub offset: usize,
    pub include_content: bool,
    pub snippet_length: usize,
    pub boost_recent: bool,
    pub boost_title: bool,
    pub boost_tags: bool,
    pub boost_exact_phrase: bool,
    pub title_weight: f32,
    pub full_text_weight: f32,
    pub semantic_weight: f32,
    /// Drop semantic hits below this cosine similarity.
    pub min_similarity: Option<f32>,
    /// Drop near-duplicate results after boosting. Off by default. The
    /// diversity cap (`ranking.diversity_max_results`) bounds each page,
    /// counted from `offset`, so later pages are not cut off.
    pub diversify: bool,
    /// Replace boosted scores with a weighted feature score.
    pub linear_reranker: Option<LinearReranker>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: 20,
            offset: 0,
            include_content: false,
            snippet_length: 200,
            boost_recent: true,
            boost_title: true,
            boost_tags: true,
            boost_exact_phrase: true,
            title_weight: 1.0,
            full_text_weight: 1.0,
            semantic_weight: 1.0,
            min_similarity: None,
            diversify: false,
            linear_reranker: None,
        }
    }
}

impl SearchOptions {
    pub fn from_config(config: &SearchConfig) -> Self {
        Self {
            limit: config.default_limit,
            snippet_length: config.snippet_length,
            title_weight: config.title_weight,
            full_text_weight: config.full_text_weight,
            semantic_weight: config.semantic_weight,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    #[must_use]
    pub const fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    #[must_use]
    pub const fn with_include_content(mut self, include: bool) -> Self {
        self.include_content = include;
        self
    }

    #[must_use]
    pub const fn with_snippet_length(mut self, length: usize) -> Self {
        self.snippet_length = length;
        self
    }

    #[must_use]
    pub const fn with_recent_boost(mut self, enabled: bool) -> Self {
        self.boost_recent = enabled;
        self
    }

    #[must_use]
    pub const fn with_title_boost(mut self, enabled: bool) -> Self {
        self.boost_title = enabled;
        self
    }

    #[must_use]
    pub const fn with_tag_boost(mut self, enabled: bool) -> Self {
        self.boost_tags = enabled;
        self
    }

    #[must_use]
    pub const fn with_exact_phrase_boost(mut self, enabled: bool) -> Self {
        self.boost_exact_phrase = enabled;
        self
    }

    #[must_use]
    pub const fn with_weights(mut self, title: f32, full_text: f32, semantic: f32) -> Self {
        self.title_weight = title;
        self.full_text_weight = full_text;
        self.semantic_weight = semantic;
        self
    }

    #[must_use]
    pub const fn with_min_similarity(mut self, threshold: f32) -> Self {
        self.min_similarity = Some(threshold);
        self
    }

    #[must_use]
    pub const fn with_diversify(mut self, enabled: bool) -> Self {
        self.diversify = enabled;
        self
    }

    #[must_use]
    pub fn with_linear_reranker(mut self, reranker: LinearReranker) -> Self {
        self.linear_reranker = Some(reranker);
        self
    }
}
