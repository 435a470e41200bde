//! Search engine orchestrator
//!
//! Owns the text index handle, the embedding provider and the in-memory
//! note map that semantic retrieval scans. Every search runs:
//!
//! ```text
//! parse → mode → retrieval scoped to `in:` paths (two paths in parallel
//!       for hybrid) → RRF (hybrid, both lists non-empty) → boosts
//!       → [linear rerank] → [diversify] → offset/limit → strip content
//! ```
//!
//! Index mutations are serialized behind one lock. The note map is
//! copy-on-write: searches clone the current `Arc` and never wait on a
//! queued write, so a note indexed mid-search may not be visible to it.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Local, TimeZone, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Result, SearchError};
use crate::search::embeddings::Embedder;
use crate::search::fulltext::search_full_text;
use crate::search::hybrid::{RrfConfig, WeightedList, fuse_results};
use crate::search::query::{ParsedQuery, SearchMode, detect_search_mode, parse};
use crate::search::rerank::BoostReranker;
use crate::search::semantic::search_semantic;
use crate::search::structured::{search_dates, search_tags};
use crate::search::types::{Note, NoteIndexEntry, SearchOptions, SearchResult, content_hash};
use crate::storage::TextIndex;

type EntryMap = HashMap<String, Arc<NoteIndexEntry>>;

/// Snapshot of what is indexed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub indexed_notes: usize,
    pub embedded_notes: usize,
    /// Rows in the persistent text index, when one is attached.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_index_notes: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dims: Option<usize>,
}

/// Outcome of [`SearchEngine::reindex_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReindexReport {
    pub notes: usize,
    /// Stored vectors kept because the note text and embedder are unchanged.
    pub reused_embeddings: usize,
    pub computed_embeddings: usize,
    pub failed_embeddings: usize,
}

pub struct SearchEngine {
    index: Option<Arc<dyn TextIndex>>,
    embedder: Option<Arc<dyn Embedder>>,
    entries: RwLock<Arc<EntryMap>>,
    write_lock: Mutex<()>,
    rrf: RrfConfig,
    reranker: BoostReranker,
    candidate_multiplier: usize,
    auto_embed: bool,
    default_options: SearchOptions,
}

impl std::fmt::Debug for SearchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchEngine")
            .field("text_index", &self.index.is_some())
            .field("embedder", &self.embedder_name())
            .field("notes", &self.entries.read().len())
            .finish_non_exhaustive()
    }
}

impl SearchEngine {
    /// Build an engine with an empty note map.
    pub fn new(
        index: Option<Arc<dyn TextIndex>>,
        embedder: Option<Arc<dyn Embedder>>,
        config: &Config,
    ) -> Self {
        Self {
            index,
            embedder,
            entries: RwLock::new(Arc::new(HashMap::new())),
            write_lock: Mutex::new(()),
            rrf: RrfConfig::with_k(config.search.rrf_k),
            reranker: BoostReranker::new(config.ranking.clone()),
            candidate_multiplier: config.search.candidate_multiplier.max(1),
            auto_embed: config.embedding.auto_embed,
            default_options: SearchOptions::from_config(&config.search),
        }
    }

    /// Build an engine over an existing text index, loading every stored
    /// note into memory. Stored vectors from a different embedder are
    /// dropped.
    pub fn open(
        index: Arc<dyn TextIndex>,
        embedder: Option<Arc<dyn Embedder>>,
        config: &Config,
    ) -> Result<Self> {
        let engine = Self::new(Some(Arc::clone(&index)), embedder, config);

        let stored = index
            .load_embeddings()
            .map_err(|err| err.for_path(SearchError::DatabaseUnavailable))?;
        let entries = index
            .load_entries()
            .map_err(|err| err.for_path(SearchError::DatabaseUnavailable))?;

        let name = engine.embedder_name().to_string();
        let dims = engine.embedder.as_ref().map(|e| e.dims());
        let map: EntryMap = entries
            .into_iter()
            .map(|mut entry| {
                let usable = stored
                    .get(&entry.note_id)
                    .is_some_and(|s| s.embedder_type == name)
                    && entry.embedding.as_ref().map(Vec::len) == dims;
                if !usable {
                    entry.embedding = None;
                }
                (entry.note_id.clone(), Arc::new(entry))
            })
            .collect();

        info!(notes = map.len(), embedder = %name, "loaded search index");
        *engine.entries.write() = Arc::new(map);
        Ok(engine)
    }

    /// Options seeded from configuration.
    #[must_use]
    pub fn default_options(&self) -> SearchOptions {
        self.default_options.clone()
    }

    #[must_use]
    pub fn has_embedder(&self) -> bool {
        self.embedder.is_some()
    }

    #[must_use]
    pub fn embedder_name(&self) -> &str {
        self.embedder.as_ref().map_or("none", |e| e.name())
    }

    // =========================================================================
    // Search
    // =========================================================================

    /// Parse and run a query. `None` (or [`SearchMode::Auto`]) picks the
    /// mode from the query shape.
    pub fn search(
        &self,
        raw: &str,
        mode: Option<SearchMode>,
        options: &SearchOptions,
    ) -> Result<Vec<SearchResult>> {
        let query = parse(raw);
        self.search_parsed(&query, mode.unwrap_or_default(), options)
    }

    pub fn search_parsed(
        &self,
        query: &ParsedQuery,
        mode: SearchMode,
        options: &SearchOptions,
    ) -> Result<Vec<SearchResult>> {
        self.search_parsed_at(query, mode, options, &Local::now())
    }

    /// Run a parsed query with calendar keywords resolved against `now`.
    pub fn search_parsed_at<Tz: TimeZone>(
        &self,
        query: &ParsedQuery,
        mode: SearchMode,
        options: &SearchOptions,
        now: &DateTime<Tz>,
    ) -> Result<Vec<SearchResult>> {
        if query.is_empty() {
            debug!(raw = %query.raw, "empty query");
            return Ok(Vec::new());
        }

        let mode = match mode {
            SearchMode::Auto => detect_search_mode(query),
            explicit => explicit,
        };
        let candidates = options
            .offset
            .saturating_add(options.limit)
            .saturating_mul(self.candidate_multiplier);
        debug!(mode = %mode, candidates, raw = %query.raw, "search");

        let results = match mode {
            SearchMode::FullText => self.full_text(query, options, candidates)?,
            SearchMode::Semantic => self.semantic(query, options, candidates)?,
            SearchMode::Tag => {
                let window = candidate_window(options, candidates);
                search_tags(self.text_index()?, query, &window)?
            }
            SearchMode::Date => {
                let window = candidate_window(options, candidates);
                search_dates(self.text_index()?, query, &window, now)?
            }
            SearchMode::Hybrid | SearchMode::Auto => self.hybrid(query, options, candidates)?,
        };

        let now = now.with_timezone(&Utc);
        let mut results = self.reranker.apply(results, query, options, now);
        if let Some(linear) = &options.linear_reranker {
            results = linear.rerank(results, query, now);
        }
        if options.diversify {
            let cap = options.offset.saturating_add(self.reranker.diversity_cap());
            results = self.reranker.diversify_up_to(results, cap);
        }

        let results: Vec<SearchResult> = results
            .into_iter()
            .skip(options.offset)
            .take(options.limit)
            .map(|mut result| {
                if !options.include_content {
                    result.content = None;
                }
                result
            })
            .collect();

        debug!(mode = %mode, results = results.len(), "search complete");
        Ok(results)
    }

    /// Re-apply diversification to an already ranked list.
    #[must_use]
    pub fn diversify(&self, results: Vec<SearchResult>) -> Vec<SearchResult> {
        self.reranker.diversify(results)
    }

    fn hybrid(
        &self,
        query: &ParsedQuery,
        options: &SearchOptions,
        candidates: usize,
    ) -> Result<Vec<SearchResult>> {
        let (text, semantic) = rayon::join(
            || self.full_text(query, options, candidates),
            || self.semantic(query, options, candidates),
        );
        let text = text?;
        let semantic = semantic?;

        if semantic.is_empty() {
            debug!(results = text.len(), "semantic path empty, using full-text list");
            return Ok(text);
        }
        if text.is_empty() {
            debug!(results = semantic.len(), "full-text path empty, using semantic list");
            return Ok(semantic);
        }

        Ok(fuse_results(
            vec![
                WeightedList::new(text, options.full_text_weight),
                WeightedList::new(semantic, options.semantic_weight),
            ],
            &self.rrf,
        ))
    }

    fn full_text(
        &self,
        query: &ParsedQuery,
        options: &SearchOptions,
        candidates: usize,
    ) -> Result<Vec<SearchResult>> {
        search_full_text(self.text_index()?, query, options, candidates, 0)
    }

    fn semantic(
        &self,
        query: &ParsedQuery,
        options: &SearchOptions,
        candidates: usize,
    ) -> Result<Vec<SearchResult>> {
        let entries = self.snapshot();
        search_semantic(&entries, self.embedder.as_deref(), query, options, candidates, 0)
    }

    fn text_index(&self) -> Result<&dyn TextIndex> {
        self.index
            .as_deref()
            .ok_or_else(|| SearchError::DatabaseUnavailable("no text index attached".to_string()))
    }

    fn snapshot(&self) -> Arc<EntryMap> {
        Arc::clone(&self.entries.read())
    }

    // =========================================================================
    // Indexing
    // =========================================================================

    /// Index or replace one note. Without a supplied vector the note is
    /// embedded when auto-embedding is on; a failed embedding is logged
    /// and the note is indexed without one.
    pub fn index_note(&self, note: &Note, path: &str, embedding: Option<Vec<f32>>) -> Result<()> {
        let _guard = self.write_lock.lock();

        let embedding = self.embedding_for(note, embedding)?;
        let entry = NoteIndexEntry::from_note(note, path, embedding);
        if let Some(index) = &self.index {
            index
                .upsert_entry(&entry, self.embedder_name())
                .map_err(indexing_failed)?;
        }

        debug!(note_id = %note.id, embedded = entry.embedding.is_some(), "indexed note");
        let mut entries = self.entries.write();
        Arc::make_mut(&mut entries).insert(entry.note_id.clone(), Arc::new(entry));
        Ok(())
    }

    /// Index or replace a batch of notes in one text-index transaction.
    /// Returns how many notes were indexed.
    pub fn index_notes(&self, notes: &[(Note, String)]) -> Result<usize> {
        let _guard = self.write_lock.lock();

        let embeddings = self.embed_many(notes.iter().map(|(note, _)| note), &HashMap::new());
        let entries: Vec<NoteIndexEntry> = notes
            .iter()
            .zip(embeddings.vectors)
            .map(|((note, path), embedding)| NoteIndexEntry::from_note(note, path, embedding))
            .collect();

        if let Some(index) = &self.index {
            index
                .upsert_entries(&entries, self.embedder_name())
                .map_err(indexing_failed)?;
        }

        let count = entries.len();
        let mut map = self.entries.write();
        let map = Arc::make_mut(&mut map);
        for entry in entries {
            map.insert(entry.note_id.clone(), Arc::new(entry));
        }
        info!(notes = count, "indexed notes");
        Ok(count)
    }

    /// Remove a note from the text index and the note map. Returns whether
    /// it was indexed.
    pub fn remove_from_index(&self, note_id: &str) -> Result<bool> {
        let _guard = self.write_lock.lock();

        let removed_from_text = match &self.index {
            Some(index) => index.remove_entry(note_id).map_err(indexing_failed)?,
            None => false,
        };
        let removed_from_map = Arc::make_mut(&mut self.entries.write())
            .remove(note_id)
            .is_some();

        debug!(note_id, removed = removed_from_text || removed_from_map, "removed note");
        Ok(removed_from_text || removed_from_map)
    }

    /// Replace everything with `notes` in one text-index transaction.
    /// Stored vectors are reused for notes whose text and embedder have not
    /// changed; the rest are embedded in one batch.
    pub fn reindex_all(&self, notes: &[(Note, String)]) -> Result<ReindexReport> {
        let _guard = self.write_lock.lock();

        let stored = match &self.index {
            Some(index) => index.load_embeddings().map_err(indexing_failed)?,
            None => HashMap::new(),
        };
        let hashes: HashMap<&str, String> = notes
            .iter()
            .map(|(note, _)| (note.id.as_str(), content_hash(&note.title, &note.content)))
            .collect();
        let dims = self.embedder.as_ref().map(|e| e.dims());
        let reusable: HashMap<String, Vec<f32>> = stored
            .into_iter()
            .filter(|(id, s)| {
                s.embedder_type == self.embedder_name()
                    && Some(s.embedding.len()) == dims
                    && s.content_hash.as_ref().is_some_and(|hash| {
                        hashes.get(id.as_str()) == Some(hash)
                    })
            })
            .map(|(id, s)| (id, s.embedding))
            .collect();

        let embeddings = self.embed_many(notes.iter().map(|(note, _)| note), &reusable);
        let entries: Vec<NoteIndexEntry> = notes
            .iter()
            .zip(embeddings.vectors)
            .map(|((note, path), embedding)| NoteIndexEntry::from_note(note, path, embedding))
            .collect();

        // The note map is swapped only after the index commits, so a failed
        // write leaves both on the previous set.
        if let Some(index) = &self.index {
            index
                .replace_all(&entries, self.embedder_name())
                .map_err(indexing_failed)?;
        }

        let map: EntryMap = entries
            .into_iter()
            .map(|entry| (entry.note_id.clone(), Arc::new(entry)))
            .collect();
        let report = ReindexReport {
            notes: map.len(),
            reused_embeddings: embeddings.reused,
            computed_embeddings: embeddings.computed,
            failed_embeddings: embeddings.failed,
        };
        *self.entries.write() = Arc::new(map);

        info!(
            notes = report.notes,
            reused = report.reused_embeddings,
            computed = report.computed_embeddings,
            failed = report.failed_embeddings,
            "reindexed all notes"
        );
        Ok(report)
    }

    #[must_use]
    pub fn stats(&self) -> IndexStats {
        let entries = self.snapshot();
        let text_index_notes = self.index.as_ref().and_then(|index| match index.count() {
            Ok(count) => Some(count),
            Err(err) => {
                warn!(error = %err, "could not count text index rows");
                None
            }
        });

        IndexStats {
            indexed_notes: entries.len(),
            embedded_notes: entries.values().filter(|e| e.embedding.is_some()).count(),
            text_index_notes,
            embedder: self.embedder.as_ref().map(|e| e.name().to_string()),
            dims: self.embedder.as_ref().map(|e| e.dims()),
        }
    }

    fn embedding_for(&self, note: &Note, supplied: Option<Vec<f32>>) -> Result<Option<Vec<f32>>> {
        if let Some(vector) = supplied {
            if let Some(embedder) = &self.embedder {
                if vector.len() != embedder.dims() {
                    return Err(SearchError::IndexingFailed(format!(
                        "embedding for {} has {} dims, provider expects {}",
                        note.id,
                        vector.len(),
                        embedder.dims()
                    )));
                }
            }
            return Ok(Some(vector));
        }

        let Some(embedder) = self.embedder.as_ref().filter(|_| self.auto_embed) else {
            return Ok(None);
        };
        match embedder.embed(&note.embedding_text()) {
            Ok(vector) => Ok(Some(vector)),
            Err(err) => {
                warn!(note_id = %note.id, error = %err, "embedding failed, indexing without vector");
                Ok(None)
            }
        }
    }

    fn embed_many<'a>(
        &self,
        notes: impl Iterator<Item = &'a Note>,
        reusable: &HashMap<String, Vec<f32>>,
    ) -> BatchEmbeddings {
        let mut out = BatchEmbeddings::default();
        let mut pending: Vec<(usize, String)> = Vec::new();

        for (idx, note) in notes.enumerate() {
            match reusable.get(&note.id) {
                Some(vector) => {
                    out.vectors.push(Some(vector.clone()));
                    out.reused += 1;
                }
                None => {
                    out.vectors.push(None);
                    pending.push((idx, note.embedding_text()));
                }
            }
        }

        let Some(embedder) = self.embedder.as_ref().filter(|_| self.auto_embed) else {
            return out;
        };
        if pending.is_empty() {
            return out;
        }

        let texts: Vec<String> = pending.iter().map(|(_, text)| text.clone()).collect();
        match embedder.embed_batch(&texts) {
            Ok(vectors) => {
                for ((idx, _), vector) in pending.iter().zip(vectors) {
                    out.vectors[*idx] = Some(vector);
                    out.computed += 1;
                }
                out.failed = pending.len() - out.computed;
            }
            Err(err) => {
                warn!(notes = pending.len(), error = %err, "batch embedding failed, indexing without vectors");
                out.failed = pending.len();
            }
        }
        out
    }
}

#[derive(Default)]
struct BatchEmbeddings {
    vectors: Vec<Option<Vec<f32>>>,
    reused: usize,
    computed: usize,
    failed: usize,
}

fn candidate_window(options: &SearchOptions, candidates: usize) -> SearchOptions {
    options.clone().with_offset(0).with_limit(candidates)
}

fn indexing_failed(err: SearchError) -> SearchError {
    match err {
        SearchError::IndexingFailed(_) => err,
        other => SearchError::IndexingFailed(other.to_string()),
    }
}
