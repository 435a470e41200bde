//! E2E Scenario: Search Workflow
//!
//! Library-level coverage of the retrieval modes over an on-disk index:
//! tag-boosted full-text ranking, auto-detected date retrieval, hybrid
//! error propagation and fusion.

use chrono::{Duration, TimeZone, Utc};

use notesift::search::{MatchType, Note, SearchMode, SearchOptions, detect_search_mode, parse};
use notesift::SearchError;

use super::fixture::E2EFixture;

fn ids(results: &[notesift::SearchResult]) -> Vec<&str> {
    results.iter().map(|r| r.note_id.as_str()).collect()
}

#[test]
fn test_tag_boost_ranks_tagged_note_first() {
    let mut fixture = E2EFixture::new("tag_boost_ranking");

    fixture.log_step("Index two notes sharing a title word");
    let engine = fixture.open_engine(None);
    let now = Utc::now();
    engine
        .index_note(
            &Note::new("a", "Swift Basics", "optionals, structs and protocols")
                .with_tags(["swift"])
                .with_updated_at(now),
            "lang",
            None,
        )
        .expect("index A");
    engine
        .index_note(
            &Note::new("b", "Rust Basics", "ownership, borrowing and traits")
                .with_tags(["rust"])
                .with_updated_at(now - Duration::days(30)),
            "lang",
            None,
        )
        .expect("index B");

    fixture.log_step("Full-text search with a tag operator");
    let results = engine
        .search("basics tag:swift", Some(SearchMode::FullText), &SearchOptions::default())
        .expect("full-text search");
    println!("[RESULTS] {:?}", ids(&results));

    assert_eq!(ids(&results), vec!["a", "b"]);
    assert!(
        results[0].score > results[1].score,
        "tagged note must score strictly higher: {} vs {}",
        results[0].score,
        results[1].score
    );

    fixture.log_step("Same query without the tag still prefers the recent note");
    let results = engine
        .search("basics", Some(SearchMode::FullText), &SearchOptions::default())
        .expect("full-text search");
    assert_eq!(results[0].note_id, "a");

    fixture.generate_report();
}

#[test]
fn test_before_query_runs_date_mode() {
    let mut fixture = E2EFixture::new("before_date_mode");

    fixture.log_step("Index notes on both sides of the cutoff");
    let engine = fixture.open_engine(None);
    let dated = [
        ("summer", Utc.with_ymd_and_hms(2023, 6, 1, 9, 0, 0).unwrap()),
        ("eve", Utc.with_ymd_and_hms(2023, 12, 31, 23, 0, 0).unwrap()),
        ("midnight", Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
        ("spring", Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()),
    ];
    for (id, updated) in dated {
        engine
            .index_note(
                &Note::new(id, id, "journal entry").with_updated_at(updated),
                "journal",
                None,
            )
            .expect("index note");
    }

    fixture.log_step("Query shape resolves to date mode");
    let query = parse("before:2024-01-01");
    assert!(query.terms.is_empty());
    assert_eq!(detect_search_mode(&query), SearchMode::Date);

    fixture.log_step("Auto mode returns only notes updated before the cutoff");
    let cutoff = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let results = engine
        .search("before:2024-01-01", None, &SearchOptions::default())
        .expect("date search");
    println!("[RESULTS] {:?}", ids(&results));

    let mut found = ids(&results);
    found.sort_unstable();
    assert_eq!(found, vec!["eve", "summer"]);
    assert!(results.iter().all(|r| r.updated_at < cutoff));
    assert!(results.iter().all(|r| r.match_type == MatchType::Date));

    fixture.generate_report();
}

#[test]
fn test_hybrid_without_embedder_is_an_error() {
    let mut fixture = E2EFixture::new("hybrid_without_embedder");

    fixture.log_step("Index a note full-text can find");
    let engine = fixture.open_engine(None);
    engine
        .index_note(&Note::new("a", "Swift Basics", "optionals"), "", None)
        .expect("index note");

    fixture.log_step("Full-text alone has a match");
    let text = engine
        .search("swift", Some(SearchMode::FullText), &SearchOptions::default())
        .expect("full-text search");
    assert_eq!(ids(&text), vec!["a"]);

    fixture.log_step("Hybrid propagates the missing provider");
    let err = engine
        .search("swift", Some(SearchMode::Hybrid), &SearchOptions::default())
        .expect_err("hybrid must fail without an embedder");
    println!("[ERROR] {err}");
    assert!(matches!(err, SearchError::EmbeddingNotAvailable));

    fixture.log_step("Auto mode on a term query is hybrid and fails the same way");
    let err = engine
        .search("swift", None, &SearchOptions::default())
        .expect_err("auto resolves to hybrid");
    assert!(matches!(err, SearchError::EmbeddingNotAvailable));

    fixture.generate_report();
}

#[test]
fn test_hybrid_fuses_both_paths() {
    let mut fixture = E2EFixture::new("hybrid_fusion");

    fixture.log_step("Index notes with the hash embedder");
    let engine = fixture.open_engine(Some(E2EFixture::hash_embedder()));
    for (id, title, body) in [
        ("swift", "Swift Basics", "optionals structs enums protocols"),
        ("rust", "Rust Basics", "ownership borrowing lifetimes traits"),
        ("bread", "Sourdough", "starter hydration flour oven"),
    ] {
        engine
            .index_note(&Note::new(id, title, body), "", None)
            .expect("index note");
    }

    fixture.log_step("Hybrid query matched by both paths");
    let results = engine
        .search("swift optionals", Some(SearchMode::Hybrid), &SearchOptions::default())
        .expect("hybrid search");
    println!("[RESULTS] {:?}", ids(&results));

    assert_eq!(results[0].note_id, "swift");
    assert_eq!(results[0].match_type, MatchType::Hybrid);
    assert!(results[0].lexical_score.is_some());
    assert!(results[0].semantic_score.is_some());

    fixture.log_step("Path filter applies to the fused list");
    let results = engine
        .search("swift in:nowhere", Some(SearchMode::Hybrid), &SearchOptions::default())
        .expect("hybrid search");
    assert!(results.is_empty());

    fixture.generate_report();
}
