//! Markdown note loading for the CLI.
//!
//! A note is a `.md` file with optional YAML frontmatter:
//!
//! ```text
//! ---
//! id: swift-basics
//! title: Swift Basics
//! tags: [swift, ios]
//! updated: 2024-03-01
//! ---
//! # Swift Basics
//! ...
//! ```
//!
//! Without frontmatter the id is the file's path relative to the notes root
//! (minus the extension), the title is the first `# ` heading or the file
//! stem, and timestamps come from the file's modification time. The index
//! path of a note is its parent directory relative to the root.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use walkdir::WalkDir;

use crate::error::{Result, SearchError};
use crate::search::query::parse_iso_date;
use crate::search::types::Note;

#[derive(Debug, Default, Deserialize)]
struct Frontmatter {
    id: Option<String>,
    title: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    created: Option<String>,
    updated: Option<String>,
}

/// A note read from disk, with the folder label used for `in:` filters.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedNote {
    pub note: Note,
    pub path: String,
    pub file: PathBuf,
}

impl LoadedNote {
    #[must_use]
    pub fn into_pair(self) -> (Note, String) {
        (self.note, self.path)
    }
}

/// Every `.md` file under `root`, sorted by file path.
pub fn load_dir(root: &Path) -> Result<Vec<LoadedNote>> {
    if !root.is_dir() {
        return Err(SearchError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("notes directory not found: {}", root.display()),
        )));
    }

    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_markdown(e.path()))
        .map(|e| e.path().to_path_buf())
        .collect();
    files.sort();

    files.iter().map(|file| load_file(file, Some(root))).collect()
}

/// Load one note. With a `root`, the id and path label are relative to it.
pub fn load_file(file: &Path, root: Option<&Path>) -> Result<LoadedNote> {
    let raw = std::fs::read_to_string(file)?;
    let modified: DateTime<Utc> = std::fs::metadata(file)?.modified()?.into();

    let relative = root
        .and_then(|root| file.strip_prefix(root).ok())
        .unwrap_or_else(|| Path::new(file.file_name().unwrap_or(file.as_os_str())));
    let fallback_id = relative.with_extension("").to_string_lossy().replace('\\', "/");
    let path = relative
        .parent()
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .unwrap_or_default();
    let stem = file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| fallback_id.clone());

    let note = parse_note(&raw, &fallback_id, &stem, modified)
        .map_err(|err| SearchError::Serialization(format!("{}: {err}", file.display())))?;

    Ok(LoadedNote {
        note,
        path,
        file: file.to_path_buf(),
    })
}

/// Build a note from markdown text.
pub fn parse_note(
    raw: &str,
    fallback_id: &str,
    fallback_title: &str,
    modified: DateTime<Utc>,
) -> Result<Note> {
    let (frontmatter, body) = split_frontmatter(raw);
    let meta: Frontmatter = match frontmatter {
        Some(yaml) if !yaml.trim().is_empty() => serde_yaml::from_str(yaml)
            .map_err(|e| SearchError::Serialization(format!("invalid frontmatter: {e}")))?,
        _ => Frontmatter::default(),
    };

    let title = meta
        .title
        .or_else(|| first_heading(body))
        .unwrap_or_else(|| fallback_title.to_string());
    let updated = meta.updated.as_deref().and_then(parse_timestamp).unwrap_or(modified);
    let created = meta.created.as_deref().and_then(parse_timestamp).unwrap_or(updated);

    Ok(Note::new(
        meta.id.unwrap_or_else(|| fallback_id.to_string()),
        title,
        body.trim(),
    )
    .with_tags(meta.tags)
    .with_created_at(created)
    .with_updated_at(updated))
}

fn split_frontmatter(raw: &str) -> (Option<&str>, &str) {
    let Some(rest) = raw.strip_prefix("---\n").or_else(|| raw.strip_prefix("---\r\n")) else {
        return (None, raw);
    };
    for marker in ["\n---\n", "\n---\r\n"] {
        if let Some(end) = rest.find(marker) {
            return (Some(&rest[..end]), &rest[end + marker.len()..]);
        }
    }
    match rest.strip_suffix("\n---") {
        Some(yaml) => (Some(yaml), ""),
        None => (None, raw),
    }
}

fn first_heading(body: &str) -> Option<String> {
    body.lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix("# "))
        .map(|heading| heading.trim().to_string())
        .filter(|heading| !heading.is_empty())
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| parse_iso_date(raw))
}

fn is_markdown(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("md") || ext.eq_ignore_ascii_case("markdown"))
}
