//! Database migrations

use rusqlite::Connection;

use crate::error::{Result, SearchError};

const MIGRATIONS: [&str; 4] = [
    include_str!("../../migrations/001_initial_schema.sql"),
    include_str!("../../migrations/002_add_fts.sql"),
    include_str!("../../migrations/003_add_embeddings.sql"),
    include_str!("../../migrations/004_add_match_keys.sql"),
];

#[allow(clippy::cast_possible_truncation)]
pub const SCHEMA_VERSION: u32 = MIGRATIONS.len() as u32;

/// Bring the schema up to [`SCHEMA_VERSION`], skipping applied steps.
pub fn run_migrations(conn: &Connection) -> Result<u32> {
    let current: u32 = conn
        .query_row("PRAGMA user_version;", [], |row| row.get(0))
        .map_err(|err| SearchError::DatabaseUnavailable(format!("read schema version: {err}")))?;

    for (target, sql) in (1..=SCHEMA_VERSION).zip(MIGRATIONS.iter()) {
        if current >= target {
            continue;
        }

        conn.execute_batch(sql)
            .map_err(|err| SearchError::IndexingFailed(format!("migration {target} failed: {err}")))?;
        conn.pragma_update(None, "user_version", target)
            .map_err(|err| {
                SearchError::IndexingFailed(format!("set user_version {target}: {err}"))
            })?;
        tracing::debug!(version = target, "applied migration");
    }

    Ok(SCHEMA_VERSION)
}
