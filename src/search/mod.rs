//! Hybrid note search
//!
//! BM25 full-text (SQLite FTS5) + embedding similarity + RRF fusion, with
//! tag and date retrieval for structured queries.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                 Raw query  →  query::parse                     │
//! └────────────────────────────────────────────────────────────────┘
//!                                │ detect_search_mode
//!          ┌─────────────┬───────┴──────┬─────────────┐
//!          ▼             ▼              ▼             ▼
//! ┌────────────────┐ ┌────────────┐ ┌──────────┐ ┌──────────┐
//! │   fulltext     │ │  semantic  │ │   tag    │ │   date   │
//! │ (FTS5 BM25)    │ │ (cosine)   │ │  (LIKE)  │ │ (range)  │
//! └────────────────┘ └────────────┘ └──────────┘ └──────────┘
//!          │             │              │             │
//!          └──────┬──────┘              │             │
//!                 ▼                     │             │
//!   ┌───────────────────────────┐       │             │
//!   │  RRF fusion (hybrid.rs)   │       │             │
//!   └───────────────────────────┘       │             │
//!                 └───────────┬─────────┴─────────────┘
//!                             ▼
//!               ┌───────────────────────────┐
//!               │  boosts (rerank.rs)       │
//!               └───────────────────────────┘
//! ```

pub mod embeddings;
pub mod embeddings_api;
pub mod engine;
pub mod filters;
pub mod fulltext;
pub mod hybrid;
pub mod query;
pub mod rerank;
pub mod semantic;
pub mod structured;
pub mod types;

// Re-export main types
pub use embeddings::{Embedder, HashEmbedder, build_embedder, cosine_similarity};
pub use embeddings_api::ApiEmbedder;
pub use engine::{IndexStats, ReindexReport, SearchEngine};
pub use filters::{PathFilter, path_key};
pub use fulltext::{build_match_expression, generate_snippet, search_full_text};
pub use hybrid::{FusedId, RrfConfig, WeightedList, fuse_ids, fuse_results};
pub use query::{
    DateModifier, DateRange, ParsedQuery, PlainTerm, SearchMode, detect_search_mode, parse,
    parse_qmd,
};
pub use rerank::{BoostReranker, LinearReranker, RankingFeatures};
pub use semantic::search_semantic;
pub use structured::{distant_future, distant_past, resolve_date_range, search_dates, search_tags};
pub use types::{MatchType, Note, NoteIndexEntry, SearchOptions, SearchResult};
