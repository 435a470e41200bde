//! SQLite database layer

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use half::f16;
use parking_lot::Mutex;
use rusqlite::types::Value;
use rusqlite::{Connection, Row, params, params_from_iter};

use crate::error::{Result, SearchError};
use crate::search::filters::{PathFilter, path_key};
use crate::search::types::{NoteIndexEntry, tokenize};
use crate::storage::{StoredEmbedding, TextHit, TextIndex, migrations};

const NOTE_COLUMNS: &str = "n.id, n.title, n.content, n.tags, n.path, n.created_at, n.updated_at";

/// SQLite-backed text index for notes.
pub struct Database {
    conn: Mutex<Connection>,
    schema_version: u32,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("schema_version", &self.schema_version)
            .finish_non_exhaustive()
    }
}

impl Database {
    /// Open database at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|err| {
                SearchError::DatabaseUnavailable(format!("create {}: {err}", parent.display()))
            })?;
        }

        let conn = Connection::open(path).map_err(|err| {
            SearchError::DatabaseUnavailable(format!("open {}: {err}", path.display()))
        })?;
        Self::from_connection(conn)
    }

    /// Open a private in-memory index.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|err| SearchError::DatabaseUnavailable(err.to_string()))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        Self::configure_pragmas(&conn).map_err(|err| err.for_path(SearchError::IndexingFailed))?;
        let schema_version = migrations::run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            schema_version,
        })
    }

    #[must_use]
    pub const fn schema_version(&self) -> u32 {
        self.schema_version
    }

    fn configure_pragmas(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -16000;
             PRAGMA temp_store = MEMORY;
             PRAGMA foreign_keys = ON;",
        )?;
        Ok(())
    }

    fn query_entries(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<NoteIndexEntry>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params, |row| entry_from_row(row, 0))?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }
}

impl TextIndex for Database {
    fn upsert_entries(&self, entries: &[NoteIndexEntry], embedder_type: &str) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        write_entries(&tx, entries, embedder_type)?;
        tx.commit()?;
        Ok(())
    }

    fn replace_all(&self, entries: &[NoteIndexEntry], embedder_type: &str) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM note_embeddings", [])?;
        tx.execute("DELETE FROM notes", [])?;
        write_entries(&tx, entries, embedder_type)?;
        tx.commit()?;
        Ok(())
    }

    fn remove_entry(&self, note_id: &str) -> Result<bool> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM note_embeddings WHERE note_id = ?1", [note_id])?;
        let deleted = tx.execute("DELETE FROM notes WHERE id = ?1", [note_id])?;
        tx.commit()?;
        Ok(deleted > 0)
    }

    fn search_fts(
        &self,
        match_expr: Option<&str>,
        title_weight: f32,
        paths: &PathFilter,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<TextHit>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let offset = i64::try_from(offset).unwrap_or(i64::MAX);
        let conn = self.conn.lock();

        let Some(expr) = match_expr else {
            let mut values = Vec::new();
            let scope = path_condition(paths, &mut values);
            values.push(Value::Integer(limit));
            values.push(Value::Integer(offset));
            let mut stmt = conn.prepare(&format!(
                "SELECT {NOTE_COLUMNS} FROM notes n
                 WHERE 1 = 1{scope}
                 ORDER BY n.updated_at DESC
                 LIMIT ?{limit_at} OFFSET ?{offset_at}",
                limit_at = values.len() - 1,
                offset_at = values.len(),
            ))?;
            let rows = stmt.query_map(params_from_iter(values), |row| {
                Ok(TextHit {
                    entry: entry_from_row(row, 0)?,
                    score: 0.0,
                })
            })?;
            let mut hits = Vec::new();
            for row in rows {
                hits.push(row?);
            }
            return Ok(hits);
        };

        let mut values = vec![Value::Text(expr.to_string())];
        let scope = path_condition(paths, &mut values);
        values.push(Value::Integer(limit));
        values.push(Value::Integer(offset));

        // bm25() is negative with lower meaning better.
        let mut stmt = conn.prepare(&format!(
            "SELECT {NOTE_COLUMNS}, bm25(notes_fts, {weight:.4}, 1.0, 0.5) AS rank
             FROM notes_fts
             JOIN notes n ON n.rowid = notes_fts.rowid
             WHERE notes_fts MATCH ?1{scope}
             ORDER BY rank
             LIMIT ?{limit_at} OFFSET ?{offset_at}",
            weight = f64::from(title_weight.max(0.0)),
            limit_at = values.len() - 1,
            offset_at = values.len(),
        ))?;
        let rows = stmt.query_map(params_from_iter(values), |row| {
            let rank: f64 = row.get(7)?;
            #[allow(clippy::cast_possible_truncation)]
            let score = (-rank).max(0.0) as f32;
            Ok(TextHit {
                entry: entry_from_row(row, 0)?,
                score,
            })
        })?;
        let mut hits = Vec::new();
        for row in rows {
            hits.push(row?);
        }
        Ok(hits)
    }

    fn search_tag(&self, tag: &str, paths: &PathFilter) -> Result<Vec<NoteIndexEntry>> {
        let mut values = vec![Value::Text(format!("%{}%", escape_like(&tag.to_lowercase())))];
        let scope = path_condition(paths, &mut values);
        self.query_entries(
            &format!(
                "SELECT {NOTE_COLUMNS} FROM notes n
                 WHERE EXISTS (
                    SELECT 1 FROM json_each(n.tag_keys) t
                    WHERE t.value LIKE ?1 ESCAPE '\\'
                 ){scope}
                 ORDER BY n.updated_at DESC"
            ),
            params_from_iter(values),
        )
    }

    fn search_updated_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        paths: &PathFilter,
    ) -> Result<Vec<NoteIndexEntry>> {
        let mut values = vec![
            Value::Integer(start.timestamp_millis()),
            Value::Integer(end.timestamp_millis()),
        ];
        let scope = path_condition(paths, &mut values);
        self.query_entries(
            &format!(
                "SELECT {NOTE_COLUMNS} FROM notes n
                 WHERE n.updated_at >= ?1 AND n.updated_at < ?2{scope}
                 ORDER BY n.updated_at DESC"
            ),
            params_from_iter(values),
        )
    }

    fn load_entries(&self) -> Result<Vec<NoteIndexEntry>> {
        let mut entries = self.query_entries(
            &format!("SELECT {NOTE_COLUMNS} FROM notes n ORDER BY n.rowid"),
            [],
        )?;
        let mut embeddings = self.load_embeddings()?;
        for entry in &mut entries {
            entry.embedding = embeddings.remove(&entry.note_id).map(|stored| stored.embedding);
        }
        Ok(entries)
    }

    fn load_embeddings(&self) -> Result<HashMap<String, StoredEmbedding>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT note_id, embedding, dims, embedder_type, content_hash FROM note_embeddings",
        )?;
        let mut rows = stmt.query([])?;
        let mut out = HashMap::new();
        while let Some(row) = rows.next()? {
            let (note_id, stored) = embedding_from_row(row)?;
            out.insert(note_id, stored);
        }
        Ok(out)
    }

    fn count(&self) -> Result<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT count(*) FROM notes", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

/// Upsert `entries` on an open transaction. Path and tag match keys are
/// case-folded here so filters compare Unicode text correctly.
fn write_entries(conn: &Connection, entries: &[NoteIndexEntry], embedder_type: &str) -> Result<()> {
    let indexed_at = Utc::now().to_rfc3339();
    let mut note_stmt = conn.prepare_cached(
        "INSERT INTO notes (id, title, content, tags, path, path_key, tag_keys, created_at, updated_at, indexed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
         ON CONFLICT(id) DO UPDATE SET
            title = excluded.title,
            content = excluded.content,
            tags = excluded.tags,
            path = excluded.path,
            path_key = excluded.path_key,
            tag_keys = excluded.tag_keys,
            created_at = excluded.created_at,
            updated_at = excluded.updated_at,
            indexed_at = excluded.indexed_at",
    )?;
    let mut embedding_stmt = conn.prepare_cached(
        "INSERT INTO note_embeddings (note_id, embedding, dims, embedder_type, content_hash, computed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(note_id) DO UPDATE SET
            embedding = excluded.embedding,
            dims = excluded.dims,
            embedder_type = excluded.embedder_type,
            content_hash = excluded.content_hash,
            computed_at = excluded.computed_at",
    )?;
    let mut drop_embedding_stmt =
        conn.prepare_cached("DELETE FROM note_embeddings WHERE note_id = ?1")?;

    for entry in entries {
        let tags = serde_json::to_string(&entry.tags)?;
        let folded: Vec<String> = entry.tags.iter().map(|tag| tag.to_lowercase()).collect();
        let tag_keys = serde_json::to_string(&folded)?;
        note_stmt.execute(params![
            entry.note_id,
            entry.title,
            entry.content,
            tags,
            entry.path,
            path_key(&entry.path),
            tag_keys,
            entry.created_at.timestamp_millis(),
            entry.updated_at.timestamp_millis(),
            indexed_at,
        ])?;

        match &entry.embedding {
            Some(embedding) => {
                embedding_stmt.execute(params![
                    entry.note_id,
                    encode_embedding_f16(embedding),
                    i64::try_from(embedding.len()).unwrap_or(i64::MAX),
                    embedder_type,
                    entry.content_hash(),
                    indexed_at,
                ])?;
            }
            None => {
                drop_embedding_stmt.execute([&entry.note_id])?;
            }
        }
    }
    Ok(())
}

/// ` AND (...)` restricting `n.path_key` to the filter's prefixes, with
/// parameters appended to `values`. Empty when the filter is empty.
fn path_condition(paths: &PathFilter, values: &mut Vec<Value>) -> String {
    if paths.is_empty() {
        return String::new();
    }
    let mut clauses = Vec::with_capacity(paths.prefixes().len());
    for prefix in paths.prefixes() {
        values.push(Value::Text(prefix.clone()));
        let exact = values.len();
        values.push(Value::Text(format!("{}/%", escape_like(prefix))));
        let nested = values.len();
        clauses.push(format!(
            "n.path_key = ?{exact} OR n.path_key LIKE ?{nested} ESCAPE '\\'"
        ));
    }
    format!(" AND ({})", clauses.join(" OR "))
}

fn entry_from_row(row: &Row<'_>, base: usize) -> rusqlite::Result<NoteIndexEntry> {
    let note_id: String = row.get(base)?;
    let title: String = row.get(base + 1)?;
    let content: String = row.get(base + 2)?;
    let tags_json: String = row.get(base + 3)?;
    let path: String = row.get(base + 4)?;
    let created_at = millis_to_datetime(row.get(base + 5)?, base + 5)?;
    let updated_at = millis_to_datetime(row.get(base + 6)?, base + 6)?;

    let tags: Vec<String> = serde_json::from_str(&tags_json).map_err(|err| {
        rusqlite::Error::FromSqlConversionFailure(
            base + 3,
            rusqlite::types::Type::Text,
            Box::new(err),
        )
    })?;

    let tokens = tokenize(&format!("{title} {content}"));
    Ok(NoteIndexEntry {
        note_id,
        title,
        content,
        tokens,
        tags,
        path,
        created_at,
        updated_at,
        embedding: None,
    })
}

fn millis_to_datetime(millis: i64, column: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis).ok_or(rusqlite::Error::IntegralValueOutOfRange(
        column, millis,
    ))
}

fn embedding_from_row(row: &Row<'_>) -> Result<(String, StoredEmbedding)> {
    let note_id: String = row.get(0)?;
    let blob: Vec<u8> = row.get(1)?;
    let dims: i64 = row.get(2)?;
    let embedder_type: String = row.get(3)?;
    let content_hash: Option<String> = row.get(4)?;

    let dims = usize::try_from(dims).unwrap_or(0);
    let embedding = decode_embedding_f16(&blob, dims)?;

    Ok((
        note_id,
        StoredEmbedding {
            embedding,
            embedder_type,
            content_hash,
        },
    ))
}

fn encode_embedding_f16(values: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * 2);
    for value in values {
        out.extend_from_slice(&f16::from_f32(*value).to_bits().to_le_bytes());
    }
    out
}

fn decode_embedding_f16(bytes: &[u8], dims: usize) -> Result<Vec<f32>> {
    let expected = dims.saturating_mul(2);
    if bytes.len() != expected {
        return Err(SearchError::Serialization(format!(
            "embedding blob length mismatch: expected {expected}, got {}",
            bytes.len()
        )));
    }

    Ok(bytes
        .chunks_exact(2)
        .map(|chunk| f16::from_bits(u16::from_le_bytes([chunk[0], chunk[1]])).to_f32())
        .collect())
}

fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}
