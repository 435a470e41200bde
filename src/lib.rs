//! notesift: hybrid full-text and semantic search over notes.
//!
//! The library entry point is [`SearchEngine`]: hand it a [`TextIndex`]
//! (usually [`Database`]) and optionally an [`Embedder`], index notes with
//! [`SearchEngine::index_note`], and query with [`SearchEngine::search`].

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod notes;
pub mod search;
pub mod storage;

pub use config::Config;
pub use error::{Result, SearchError};
pub use search::{
    Embedder, MatchType, Note, ParsedQuery, SearchEngine, SearchMode, SearchOptions, SearchResult,
};
pub use storage::{Database, TextIndex};

/// Package version from Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
