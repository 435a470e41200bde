//! Storage layer for notesift
//!
//! The search engine only talks to storage through [`TextIndex`]. The
//! SQLite implementation keeps an FTS5 index for BM25 retrieval and stores
//! note embeddings so semantic search survives restarts.

pub mod migrations;
pub mod sqlite;

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::search::filters::PathFilter;
use crate::search::types::NoteIndexEntry;

pub use sqlite::Database;

/// A full-text hit with its normalized (non-negative, higher is better)
/// BM25 score.
#[derive(Debug, Clone, PartialEq)]
pub struct TextHit {
    pub entry: NoteIndexEntry,
    pub score: f32,
}

/// A persisted embedding and the hash of the text it was computed from.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEmbedding {
    pub embedding: Vec<f32>,
    pub embedder_type: String,
    pub content_hash: Option<String>,
}

/// Text-index capability handed to the search engine at construction.
///
/// Entries returned from queries never carry embeddings; those live in the
/// engine's in-memory map. Every query takes the `in:` path filter so it is
/// applied before `limit` cuts the result window.
pub trait TextIndex: Send + Sync {
    /// Insert or replace entries (and their embeddings) atomically.
    fn upsert_entries(&self, entries: &[NoteIndexEntry], embedder_type: &str) -> Result<()>;

    fn upsert_entry(&self, entry: &NoteIndexEntry, embedder_type: &str) -> Result<()> {
        self.upsert_entries(std::slice::from_ref(entry), embedder_type)
    }

    /// Drop every indexed note and write `entries` in their place, all or
    /// nothing.
    fn replace_all(&self, entries: &[NoteIndexEntry], embedder_type: &str) -> Result<()>;

    /// Remove a note. Returns whether a row was deleted.
    fn remove_entry(&self, note_id: &str) -> Result<bool>;

    /// Run a BM25 query. `None` matches every note (score 0, newest first).
    fn search_fts(
        &self,
        match_expr: Option<&str>,
        title_weight: f32,
        paths: &PathFilter,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<TextHit>>;

    /// Notes with a tag containing `tag` (case-insensitive), newest first.
    fn search_tag(&self, tag: &str, paths: &PathFilter) -> Result<Vec<NoteIndexEntry>>;

    /// Notes updated in `[start, end)`, newest first.
    fn search_updated_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        paths: &PathFilter,
    ) -> Result<Vec<NoteIndexEntry>>;

    /// Every indexed note with its stored embedding, if any.
    fn load_entries(&self) -> Result<Vec<NoteIndexEntry>>;

    /// Stored embeddings keyed by note id.
    fn load_embeddings(&self) -> Result<HashMap<String, StoredEmbedding>>;

    fn count(&self) -> Result<usize>;
}
