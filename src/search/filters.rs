//! Structured filters pushed down into retrieval.
//!
//! Only paths are filtered here. Tags and dates drive their own retrieval
//! modes; in text and hybrid modes they act through the tag boost only.

use crate::search::query::ParsedQuery;

/// Path-prefix filter (`in:` operator).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathFilter {
    prefixes: Vec<String>,
}

impl PathFilter {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let prefixes = paths
            .into_iter()
            .map(|p| path_key(p.as_ref()))
            .filter(|p| !p.is_empty())
            .collect();
        Self { prefixes }
    }

    pub fn from_query(query: &ParsedQuery) -> Self {
        Self::new(&query.paths)
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }

    /// Normalized prefixes, in the form produced by [`path_key`].
    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    /// A result passes when its path equals one of the prefixes or lies
    /// under it. Comparison ignores case and surrounding slashes.
    pub fn matches(&self, path: &str) -> bool {
        if self.is_empty() {
            return true;
        }
        let path = path_key(path);
        self.prefixes.iter().any(|prefix| {
            path == *prefix
                || path
                    .strip_prefix(prefix.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }
}

/// Case-folded form of a note path with surrounding slashes removed. The
/// text index stores this next to each note for prefix matching.
#[must_use]
pub fn path_key(raw: &str) -> String {
    raw.trim().trim_matches('/').to_lowercase()
}
