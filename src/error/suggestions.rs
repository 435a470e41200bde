//! Context-aware error suggestions.
//!
//! Complements the static suggestions in the `codes` module with hints
//! that mention the note or path involved.

use serde_json::Value;

use super::codes::ErrorCode;

/// Generate a context-aware suggestion for an error.
pub fn suggest_for_error(code: ErrorCode, context: Option<&Value>) -> String {
    match code {
        ErrorCode::NotFound => suggest_note_not_found(context),
        ErrorCode::DatabaseUnavailable => suggest_database_unavailable(context),
        ErrorCode::FullTextFailed => suggest_full_text_failed(context),
        _ => code.suggestion().to_string(),
    }
}

fn suggest_note_not_found(context: Option<&Value>) -> String {
    let Some(note_id) = context
        .and_then(|c| c.get("note_id"))
        .and_then(Value::as_str)
    else {
        return ErrorCode::NotFound.suggestion().to_string();
    };

    format!(
        "Note '{note_id}' is not in the index. Try:\n  - `notesift search {note_id}` to find it by content\n  - `notesift stats` to check how many notes are indexed"
    )
}

fn suggest_database_unavailable(context: Option<&Value>) -> String {
    let Some(detail) = context
        .and_then(|c| c.get("detail"))
        .and_then(Value::as_str)
    else {
        return ErrorCode::DatabaseUnavailable.suggestion().to_string();
    };

    format!(
        "The text index could not be reached ({detail}). Check the --db path or rebuild it with `notesift index <dir>`"
    )
}

fn suggest_full_text_failed(context: Option<&Value>) -> String {
    let detail = context
        .and_then(|c| c.get("detail"))
        .and_then(Value::as_str)
        .unwrap_or_default();

    if detail.contains("syntax") {
        return "The full-text engine rejected the query syntax. Remove stray quotes or special characters".to_string();
    }
    ErrorCode::FullTextFailed.suggestion().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_mentions_note_id() {
        let ctx = serde_json::json!({ "note_id": "note-42" });
        let suggestion = suggest_for_error(ErrorCode::NotFound, Some(&ctx));
        assert!(suggestion.contains("note-42"));
    }

    #[test]
    fn not_found_without_context_uses_static() {
        let suggestion = suggest_for_error(ErrorCode::NotFound, None);
        assert_eq!(suggestion, ErrorCode::NotFound.suggestion());
    }

    #[test]
    fn database_unavailable_includes_detail() {
        let ctx = serde_json::json!({ "detail": "unable to open database file" });
        let suggestion = suggest_for_error(ErrorCode::DatabaseUnavailable, Some(&ctx));
        assert!(suggestion.contains("unable to open database file"));
    }

    #[test]
    fn full_text_syntax_gets_specific_hint() {
        let ctx = serde_json::json!({ "detail": "fts5: syntax error near \"\"" });
        let suggestion = suggest_for_error(ErrorCode::FullTextFailed, Some(&ctx));
        assert!(suggestion.contains("syntax"));
    }

    #[test]
    fn other_codes_fall_back_to_static() {
        let suggestion = suggest_for_error(ErrorCode::EmbeddingFailed, None);
        assert_eq!(suggestion, ErrorCode::EmbeddingFailed.suggestion());
    }
}
