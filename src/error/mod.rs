//! Error handling for notesift.
//!
//! This module provides:
//! - [`SearchError`]: The main error enum for indexing and retrieval
//! - [`ErrorCode`]: Standardized error codes for machine parsing
//! - [`StructuredError`]: Rich error type with suggestions and context

mod codes;
mod suggestions;

use std::io;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub use codes::ErrorCode;
pub use suggestions::suggest_for_error;

/// Main error type for notesift operations.
///
/// Retrieval paths never convert an error into an empty result: callers
/// can always tell "no matches" apart from "the path failed".
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Text index unavailable: {0}")]
    DatabaseUnavailable(String),

    #[error("No embedding provider is configured")]
    EmbeddingNotAvailable,

    #[error("Embedding failed: {0}")]
    EmbeddingFailed(String),

    #[error("Full-text search failed: {0}")]
    FullTextFailed(String),

    #[error("Tag search failed: {0}")]
    TagSearchFailed(String),

    #[error("Date search failed: {0}")]
    DateSearchFailed(String),

    #[error("Indexing failed: {0}")]
    IndexingFailed(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Missing required config: {0}")]
    MissingConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl SearchError {
    /// Get the error code for this error.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::DatabaseUnavailable(_) => ErrorCode::DatabaseUnavailable,
            Self::EmbeddingNotAvailable => ErrorCode::EmbeddingNotAvailable,
            Self::EmbeddingFailed(_) => ErrorCode::EmbeddingFailed,
            Self::FullTextFailed(_) => ErrorCode::FullTextFailed,
            Self::TagSearchFailed(_) => ErrorCode::TagSearchFailed,
            Self::DateSearchFailed(_) => ErrorCode::DateSearchFailed,
            Self::IndexingFailed(_) => ErrorCode::IndexingFailed,
            Self::Database(_) => ErrorCode::DatabaseError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) | Self::Serialization(_) => ErrorCode::SerializationError,
            Self::Config(_) => ErrorCode::ConfigInvalid,
            Self::MissingConfig(_) => ErrorCode::ConfigMissingRequired,
            Self::NotFound(_) => ErrorCode::NotFound,
        }
    }

    /// Get context information for this error as JSON.
    #[must_use]
    pub fn context(&self) -> Option<Value> {
        match self {
            Self::NotFound(id) => Some(serde_json::json!({ "note_id": id })),
            Self::DatabaseUnavailable(detail)
            | Self::FullTextFailed(detail)
            | Self::TagSearchFailed(detail)
            | Self::DateSearchFailed(detail)
            | Self::IndexingFailed(detail)
            | Self::EmbeddingFailed(detail) => Some(serde_json::json!({ "detail": detail })),
            Self::MissingConfig(key) => Some(serde_json::json!({ "config_key": key })),
            _ => None,
        }
    }

    /// Convert this error to a structured error.
    #[must_use]
    pub fn to_structured(&self) -> StructuredError {
        StructuredError::from_search_error(self)
    }

    /// Reclassify a storage failure raised inside a retrieval or indexing
    /// path. An unreachable store becomes [`SearchError::DatabaseUnavailable`];
    /// anything else becomes the path's own variant built by `wrap`.
    #[must_use]
    pub fn for_path(self, wrap: fn(String) -> Self) -> Self {
        match self {
            Self::DatabaseUnavailable(_) | Self::EmbeddingNotAvailable => self,
            Self::Database(err) if is_unavailable(&err) => {
                Self::DatabaseUnavailable(err.to_string())
            }
            Self::Database(err) => wrap(err.to_string()),
            Self::Io(err) => Self::DatabaseUnavailable(err.to_string()),
            other => wrap(other.to_string()),
        }
    }
}

fn is_unavailable(err: &rusqlite::Error) -> bool {
    use rusqlite::ErrorCode as Sqlite;

    match err {
        rusqlite::Error::SqliteFailure(failure, _) => matches!(
            failure.code,
            Sqlite::CannotOpen
                | Sqlite::NotADatabase
                | Sqlite::DatabaseCorrupt
                | Sqlite::SystemIoFailure
        ),
        _ => false,
    }
}

/// A structured error with machine-readable code, suggestion, and context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// The error code (e.g., "FULL_TEXT_FAILED")
    pub code: ErrorCode,

    /// The numeric error code (e.g., 402)
    pub numeric_code: u16,

    /// Human-readable error message
    pub message: String,

    /// Actionable suggestion for recovery
    pub suggestion: String,

    /// Additional context for debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,

    /// Whether this error is potentially recoverable by the user
    pub recoverable: bool,

    /// Error category (e.g., "search", "config", "embedding")
    pub category: String,
}

impl StructuredError {
    /// Create a new structured error.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            numeric_code: code.numeric(),
            suggestion: code.suggestion().to_string(),
            context: None,
            recoverable: code.is_recoverable(),
            category: code.category().to_string(),
            code,
            message: message.into(),
        }
    }

    /// Create a structured error from a [`SearchError`].
    #[must_use]
    pub fn from_search_error(err: &SearchError) -> Self {
        let code = err.code();
        let context = err.context();
        let suggestion = suggest_for_error(code, context.as_ref());

        Self {
            code,
            numeric_code: code.numeric(),
            message: err.to_string(),
            suggestion,
            context,
            recoverable: code.is_recoverable(),
            category: code.category().to_string(),
        }
    }

    /// Add context to this error.
    #[must_use]
    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self.suggestion = suggest_for_error(self.code, self.context.as_ref());
        self
    }
}

impl std::fmt::Display for StructuredError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl From<&SearchError> for StructuredError {
    fn from(err: &SearchError) -> Self {
        Self::from_search_error(err)
    }
}

/// Result type alias using [`SearchError`].
pub type Result<T> = std::result::Result<T, SearchError>;
