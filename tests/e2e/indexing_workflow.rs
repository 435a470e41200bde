//! E2E Scenario: Indexing Workflow
//!
//! Drives the binary end to end: index a notes directory, search it in
//! every mode, update and remove notes, then reopen the database from the
//! library and check the persisted state.

use notesift::search::{SearchMode, SearchOptions};

use super::fixture::E2EFixture;

const SWIFT_NOTE: &str = r#"---
id: swift-basics
title: Swift Basics
tags: [swift, ios]
updated: 2023-11-20
---
Optionals, structs and protocol extensions.
"#;

const RUST_NOTE: &str = r#"---
id: rust-basics
title: Rust Basics
tags: [rust]
updated: 2024-02-10
---
Ownership, borrowing and traits.
"#;

const BREAD_NOTE: &str = r#"---
updated: 2020-05-01
---
# Sourdough

Starter hydration and flour ratios.
"#;

fn result_ids(json: &serde_json::Value) -> Vec<String> {
    json["data"]["results"]
        .as_array()
        .expect("results array")
        .iter()
        .map(|r| r["note_id"].as_str().expect("note_id").to_string())
        .collect()
}

fn seed(fixture: &mut E2EFixture) {
    fixture.log_step("Write notes");
    fixture.write_note("lang/swift.md", SWIFT_NOTE);
    fixture.write_note("lang/rust.md", RUST_NOTE);
    fixture.write_note("home/bread.md", BREAD_NOTE);

    fixture.log_step("Index the notes directory");
    let notes = fixture.notes_path().display().to_string();
    let output = fixture.run(&["--json", "index", &notes]);
    fixture.assert_success(&output, "index");
    let json = output.json();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["data"]["notes"], 3);
    assert_eq!(json["data"]["computed_embeddings"], 3);
}

#[test]
fn test_index_and_search_modes() {
    let mut fixture = E2EFixture::new("index_and_search_modes");
    seed(&mut fixture);

    fixture.log_step("Tag-only query runs tag mode");
    let output = fixture.run(&["--json", "search", "tag:swift"]);
    fixture.assert_success(&output, "tag search");
    let json = output.json();
    assert_eq!(json["data"]["mode"], "tag");
    assert_eq!(result_ids(&json), vec!["swift-basics"]);

    fixture.log_step("Date-only query runs date mode");
    let output = fixture.run(&["--json", "search", "before:2024-01-01"]);
    fixture.assert_success(&output, "date search");
    let json = output.json();
    assert_eq!(json["data"]["mode"], "date");
    assert!(result_ids(&json).contains(&"swift-basics".to_string()));
    assert!(!result_ids(&json).contains(&"rust-basics".to_string()));

    fixture.log_step("Term query runs hybrid mode");
    let output = fixture.run(&["--json", "search", "ownership borrowing"]);
    fixture.assert_success(&output, "hybrid search");
    let json = output.json();
    assert_eq!(json["data"]["mode"], "hybrid");
    assert_eq!(result_ids(&json)[0], "rust-basics");

    fixture.log_step("Path filter narrows to a folder");
    let output = fixture.run(&["--json", "search", "--mode", "full-text", "in:home"]);
    fixture.assert_success(&output, "path search");
    assert_eq!(result_ids(&output.json()), vec!["home/bread"]);

    fixture.log_step("Human output lists titles");
    let output = fixture.run(&["-O", "plain", "search", "tag:rust"]);
    fixture.assert_success(&output, "plain search");
    fixture.assert_output_contains(&output, "Rust Basics");

    fixture.generate_report();
}

#[test]
fn test_update_remove_and_reopen() {
    let mut fixture = E2EFixture::new("update_remove_reopen");
    seed(&mut fixture);

    fixture.log_step("Reindexing unchanged notes reuses stored vectors");
    let notes = fixture.notes_path().display().to_string();
    let output = fixture.run(&["--json", "index", &notes]);
    fixture.assert_success(&output, "reindex");
    let json = output.json();
    assert_eq!(json["data"]["reused_embeddings"], 3);
    assert_eq!(json["data"]["computed_embeddings"], 0);

    fixture.log_step("Add a new note file");
    let file = fixture.write_note(
        "lang/go.md",
        "---\nid: go-basics\ntitle: Go Basics\ntags: [go]\n---\nGoroutines and channels.\n",
    );
    let file = file.display().to_string();
    let output = fixture.run(&["--json", "add", &file, "--root", &notes]);
    fixture.assert_success(&output, "add");
    assert_eq!(output.json()["data"]["note_ids"][0], "go-basics");

    fixture.log_step("Remove a note");
    let output = fixture.run(&["--json", "remove", "rust-basics"]);
    fixture.assert_success(&output, "remove");

    fixture.log_step("Removing it again is NOT_FOUND");
    let output = fixture.run(&["--json", "remove", "rust-basics"]);
    fixture.assert_failure(&output, "second remove");
    assert_eq!(output.json()["status"]["error"]["code"], "NOT_FOUND");

    fixture.log_step("Stats reflect the mutations");
    let output = fixture.run(&["--json", "stats"]);
    fixture.assert_success(&output, "stats");
    let json = output.json();
    assert_eq!(json["data"]["indexed_notes"], 3);
    assert_eq!(json["data"]["embedded_notes"], 3);
    assert_eq!(json["data"]["embedder"], "hash");

    fixture.log_step("Reopen from the library with the same embedder");
    let engine = fixture.open_engine(Some(E2EFixture::hash_embedder()));
    assert_eq!(engine.stats().indexed_notes, 3);
    assert_eq!(engine.stats().embedded_notes, 3);
    let results = engine
        .search("goroutines channels", Some(SearchMode::Semantic), &SearchOptions::default())
        .expect("semantic search");
    assert_eq!(results[0].note_id, "go-basics");

    fixture.log_step("Reopen without an embedder keeps text search working");
    let engine = fixture.open_engine(None);
    assert_eq!(engine.stats().embedded_notes, 0);
    let results = engine
        .search("goroutines", Some(SearchMode::FullText), &SearchOptions::default())
        .expect("full-text search");
    assert_eq!(results[0].note_id, "go-basics");

    fixture.generate_report();
}
