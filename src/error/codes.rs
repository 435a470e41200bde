//! Standardized error codes for machine-parseable output.
//!
//! Error codes follow a numeric taxonomy:
//! - 2xx: Index errors
//! - 3xx: Config errors
//! - 4xx: Search errors
//! - 5xx: Embedding / network errors
//! - 6xx: Storage errors
//! - 9xx: Internal errors

use serde::{Deserialize, Serialize};

/// Standardized error codes for JSON output.
///
/// Each variant maps to a numeric code (e.g., `FullTextFailed` -> E402).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================
    // Index errors (2xx)
    // ========================================
    /// E202: Writing to the index failed
    IndexingFailed,

    // ========================================
    // Config errors (3xx)
    // ========================================
    /// E302: Config file has invalid syntax or values
    ConfigInvalid,
    /// E304: Required config value is missing
    ConfigMissingRequired,

    // ========================================
    // Search errors (4xx)
    // ========================================
    /// E401: Backing text index is unreachable
    DatabaseUnavailable,
    /// E402: Full-text query execution failed
    FullTextFailed,
    /// E403: Tag retrieval failed
    TagSearchFailed,
    /// E404: Date retrieval failed
    DateSearchFailed,

    // ========================================
    // Embedding errors (5xx)
    // ========================================
    /// E501: No embedding provider is configured
    EmbeddingNotAvailable,
    /// E502: The embedding provider returned an error
    EmbeddingFailed,

    // ========================================
    // Storage errors (6xx)
    // ========================================
    /// E604: Database operation failed
    DatabaseError,
    /// E605: Serialization/deserialization failed
    SerializationError,

    // ========================================
    // Internal errors (9xx)
    // ========================================
    /// E905: Generic not found (catch-all)
    NotFound,
    /// E906: IO operation failed
    IoError,
}

impl ErrorCode {
    /// Get the numeric error code (e.g., `FullTextFailed` -> 402).
    #[must_use]
    pub const fn numeric(&self) -> u16 {
        match self {
            Self::IndexingFailed => 202,

            Self::ConfigInvalid => 302,
            Self::ConfigMissingRequired => 304,

            Self::DatabaseUnavailable => 401,
            Self::FullTextFailed => 402,
            Self::TagSearchFailed => 403,
            Self::DateSearchFailed => 404,

            Self::EmbeddingNotAvailable => 501,
            Self::EmbeddingFailed => 502,

            Self::DatabaseError => 604,
            Self::SerializationError => 605,

            Self::NotFound => 905,
            Self::IoError => 906,
        }
    }

    #[must_use]
    pub fn code_string(&self) -> String {
        format!("E{}", self.numeric())
    }

    #[must_use]
    pub const fn suggestion(&self) -> &'static str {
        match self {
            Self::IndexingFailed => "Check that the index database is writable, then re-run the indexing command",

            Self::ConfigInvalid => "Check TOML syntax and value ranges in the config file and NOTESIFT_* variables",
            Self::ConfigMissingRequired => "Set the missing value in config.toml or via its NOTESIFT_* environment variable",

            Self::DatabaseUnavailable => "Check that the index database path exists and is readable, or pass --db <path>",
            Self::FullTextFailed => "Simplify the query. Quotes must be balanced for phrase search",
            Self::TagSearchFailed => "Retry the tag query. If it persists, rebuild the index with `notesift index <dir>`",
            Self::DateSearchFailed => "Use ISO dates (YYYY-MM-DD) with before:, after:, from: and to:",

            Self::EmbeddingNotAvailable => "Configure an embedding backend ([embedding] backend = \"hash\" or \"api\") or use --mode full-text",
            Self::EmbeddingFailed => "Check the embedding API URL, model name and API key",

            Self::DatabaseError => "The index database reported an error. Rebuild it with `notesift index <dir>`",
            Self::SerializationError => "Stored data could not be decoded. Rebuild the index with `notesift index <dir>`",

            Self::NotFound => "The requested note was not found. Check the identifier",
            Self::IoError => "File operation failed. Check path exists and permissions are correct",
        }
    }

    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        match self {
            Self::IndexingFailed
            | Self::ConfigInvalid
            | Self::ConfigMissingRequired
            | Self::DatabaseUnavailable
            | Self::FullTextFailed
            | Self::TagSearchFailed
            | Self::DateSearchFailed
            | Self::EmbeddingNotAvailable
            | Self::EmbeddingFailed
            | Self::NotFound
            | Self::IoError => true,

            Self::DatabaseError | Self::SerializationError => false,
        }
    }

    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self.numeric() / 100 {
            2 => "index",
            3 => "config",
            4 => "search",
            5 => "embedding",
            6 => "storage",
            9 => "internal",
            _ => "unknown",
        }
    }

    pub fn all() -> impl Iterator<Item = Self> {
        [
            Self::IndexingFailed,
            Self::ConfigInvalid,
            Self::ConfigMissingRequired,
            Self::DatabaseUnavailable,
            Self::FullTextFailed,
            Self::TagSearchFailed,
            Self::DateSearchFailed,
            Self::EmbeddingNotAvailable,
            Self::EmbeddingFailed,
            Self::DatabaseError,
            Self::SerializationError,
            Self::NotFound,
            Self::IoError,
        ]
        .into_iter()
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code_string())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn numeric_codes_are_unique() {
        let mut seen = HashSet::new();
        for code in ErrorCode::all() {
            assert!(seen.insert(code.numeric()), "duplicate code {code}");
        }
    }

    #[test]
    fn category_follows_hundreds_digit() {
        assert_eq!(ErrorCode::IndexingFailed.category(), "index");
        assert_eq!(ErrorCode::ConfigInvalid.category(), "config");
        assert_eq!(ErrorCode::FullTextFailed.category(), "search");
        assert_eq!(ErrorCode::EmbeddingNotAvailable.category(), "embedding");
        assert_eq!(ErrorCode::DatabaseError.category(), "storage");
        assert_eq!(ErrorCode::NotFound.category(), "internal");
    }

    #[test]
    fn code_string_is_prefixed() {
        assert_eq!(ErrorCode::DateSearchFailed.code_string(), "E404");
        assert_eq!(ErrorCode::DateSearchFailed.to_string(), "E404");
    }

    #[test]
    fn every_code_has_a_suggestion() {
        for code in ErrorCode::all() {
            assert!(!code.suggestion().is_empty(), "{code} has no suggestion");
        }
    }

    #[test]
    fn serializes_screaming_snake_case() {
        let json = serde_json::to_string(&ErrorCode::EmbeddingNotAvailable).unwrap();
        assert_eq!(json, "\"EMBEDDING_NOT_AVAILABLE\"");
    }
}
