//! Shared state for CLI commands.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use crate::cli::{Cli, OutputFormat};
use crate::config::Config;
use crate::error::Result;
use crate::search::{SearchEngine, build_embedder};
use crate::storage::{Database, TextIndex};

pub struct AppContext {
    pub config: Config,
    pub db_path: PathBuf,
    pub db: Arc<Database>,
    pub engine: SearchEngine,
    pub output: OutputFormat,
}

impl AppContext {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let mut config = Config::load(cli.config.as_deref())?;
        if let Some(db) = &cli.db {
            config.index.db_path = Some(db.clone());
        }
        Self::from_config(config, cli.output_format())
    }

    /// Open the index database and rehydrate the engine from it.
    pub fn from_config(config: Config, output: OutputFormat) -> Result<Self> {
        let db_path = config.db_path()?;
        let db = Arc::new(Database::open(&db_path)?);
        let embedder = build_embedder(&config.embedding)?;
        debug!(
            db = %db_path.display(),
            embedder = embedder.as_ref().map_or("none", |e| e.name()),
            "opening search engine"
        );

        let index: Arc<dyn TextIndex> = db.clone();
        let engine = SearchEngine::open(index, embedder, &config)?;

        Ok(Self {
            config,
            db_path,
            db,
            engine,
            output,
        })
    }

    #[must_use]
    pub fn json(&self) -> bool {
        self.output.is_machine_readable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_config_opens_fresh_database() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.index.db_path = Some(dir.path().join("nested/index.db"));

        let ctx = AppContext::from_config(config, OutputFormat::Json).unwrap();
        assert!(ctx.db_path.exists());
        assert!(ctx.json());
        assert_eq!(ctx.engine.stats().indexed_notes, 0);
        assert_eq!(ctx.engine.embedder_name(), "hash");
    }
}
