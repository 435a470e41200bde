use chrono::{NaiveDate, TimeZone, Utc};
use proptest::prelude::*;

use notesift::search::{DateModifier, PlainTerm, SearchMode, detect_search_mode, parse, parse_qmd};

/// Lowercase words that are never operators or boolean keywords.
fn arb_word() -> impl Strategy<Value = String> {
    "[a-z]{2,10}".prop_filter("not an operator word", |w| {
        !matches!(w.as_str(), "and" | "or" | "not")
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn parse_is_deterministic(raw in ".{0,80}") {
        prop_assert_eq!(parse(&raw), parse(&raw));
        prop_assert_eq!(parse_qmd(&raw), parse_qmd(&raw));
    }

    #[test]
    fn parse_keeps_raw_text(raw in ".{0,80}") {
        prop_assert_eq!(parse(&raw).raw, raw.clone());
        prop_assert_eq!(parse_qmd(&raw).raw, raw);
    }

    #[test]
    fn tag_operator_is_lifted_out_of_terms(
        before in arb_word(),
        tag in "[A-Za-z][A-Za-z0-9_-]{0,12}",
        after in arb_word(),
    ) {
        let query = parse(&format!("{before} tag:{tag} {after}"));
        prop_assert!(query.tags.contains(&tag.to_lowercase()));
        prop_assert_eq!(query.tags.len(), 1);
        let terms: Vec<&str> = query.term_texts().collect();
        prop_assert_eq!(terms, vec![before.as_str(), after.as_str()]);
        prop_assert_eq!(detect_search_mode(&query), SearchMode::Hybrid);
    }

    #[test]
    fn tags_alone_select_tag_mode(tags in prop::collection::vec("[a-z]{1,8}", 1..4)) {
        let raw = tags.iter().map(|t| format!("tag:{t}")).collect::<Vec<_>>().join(" ");
        let query = parse(&raw);
        prop_assert!(query.terms.is_empty());
        for tag in &tags {
            prop_assert!(query.tags.contains(tag));
        }
        prop_assert_eq!(detect_search_mode(&query), SearchMode::Tag);
    }

    #[test]
    fn in_operator_collects_paths(word in arb_word(), path in "[a-z]{1,6}(/[a-z]{1,6}){0,2}") {
        let query = parse(&format!("in:{path} {word}"));
        prop_assert!(query.paths.contains(&path));
        let terms: Vec<&str> = query.term_texts().collect();
        prop_assert_eq!(terms, vec![word.as_str()]);
    }

    #[test]
    fn before_date_selects_date_mode(year in 1990i32..2035, month in 1u32..=12, day in 1u32..=28) {
        let date = NaiveDate::from_ymd_opt(year, month, day).unwrap();
        let query = parse(&format!("before:{}", date.format("%Y-%m-%d")));
        let range = query.date_range.clone().unwrap();
        prop_assert_eq!(range.modifier, DateModifier::Before);
        prop_assert_eq!(range.start, None);
        prop_assert_eq!(
            range.end,
            Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap()))
        );
        prop_assert_eq!(detect_search_mode(&query), SearchMode::Date);
    }

    #[test]
    fn quoted_text_becomes_one_phrase(words in prop::collection::vec(arb_word(), 1..4)) {
        let phrase = words.join(" ");
        let query = parse(&format!("\"{phrase}\""));
        prop_assert_eq!(query.terms, vec![PlainTerm::Phrase(phrase)]);
    }

    #[test]
    fn qmd_hash_tags_are_lowercased(word in arb_word(), tag in "[A-Za-z]{1,10}") {
        let query = parse_qmd(&format!("{word} #{tag}"));
        prop_assert!(query.tags.contains(&tag.to_lowercase()));
        let terms: Vec<&str> = query.term_texts().collect();
        prop_assert_eq!(terms, vec![word.as_str()]);
    }
}
