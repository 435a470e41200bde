use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;

use notesift::config::RankingConfig;
use notesift::search::{
    BoostReranker, MatchType, Note, NoteIndexEntry, RrfConfig, SearchOptions, SearchResult,
    fuse_ids, parse,
};

fn result(id: &str, title: &str, body: &str, score: f32, age_days: i64) -> SearchResult {
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    let note = Note::new(id, title, body).with_updated_at(now - Duration::days(age_days));
    let entry = NoteIndexEntry::from_note(&note, "", None);
    SearchResult::from_entry(&entry, score, MatchType::FullText, String::new(), vec![])
}

fn arb_results() -> impl Strategy<Value = Vec<SearchResult>> {
    prop::collection::vec(
        ("[a-z]{3,8}( [a-z]{3,8}){0,2}", "[a-z ]{0,60}", 0.0f32..20.0, 0i64..2000),
        0..12,
    )
    .prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (title, body, score, age))| result(&format!("n{i}"), &title, &body, score, age))
            .collect()
    })
}

fn distinct_ids(len: usize) -> Vec<String> {
    (0..len).map(|i| format!("id{i}")).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(96))]

    #[test]
    fn single_list_fusion_keeps_rank_order(len in 1usize..40, k in 1.0f32..120.0) {
        let ids = distinct_ids(len);
        let fused = fuse_ids(&[(ids.as_slice(), 1.0)], &RrfConfig::with_k(k));
        let order: Vec<&str> = fused.iter().map(|f| f.note_id.as_str()).collect();
        let expected: Vec<&str> = ids.iter().map(String::as_str).collect();
        prop_assert_eq!(order, expected);
        prop_assert!(fused.windows(2).all(|w| w[0].score > w[1].score));
    }

    #[test]
    fn appearing_in_both_lists_never_lowers_a_score(
        len in 1usize..20,
        pick in 0usize..20,
        other_rank in 0usize..20,
    ) {
        let text = distinct_ids(len);
        let pick = pick % len;
        let mut semantic: Vec<String> = (0..len).map(|i| format!("other{i}")).collect();
        let insert_at = other_rank.min(semantic.len());
        semantic.insert(insert_at, text[pick].clone());

        let config = RrfConfig::default();
        let alone = fuse_ids(&[(text.as_slice(), 1.0)], &config);
        let both = fuse_ids(&[(text.as_slice(), 1.0), (semantic.as_slice(), 1.0)], &config);

        let score = |fused: &[notesift::search::FusedId]| {
            fused.iter().find(|f| f.note_id == text[pick]).map(|f| f.score).unwrap()
        };
        prop_assert!(score(&both) > score(&alone));
        let hit = both.iter().find(|f| f.note_id == text[pick]).unwrap();
        prop_assert_eq!(hit.list_count(), 2);
    }

    #[test]
    fn boosting_preserves_the_result_set(results in arb_results(), raw in "[a-z]{3,8}( tag:[a-z]{3,6})?") {
        let reranker = BoostReranker::new(RankingConfig::default());
        let query = parse(&raw);
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();

        let mut before: Vec<String> = results.iter().map(|r| r.note_id.clone()).collect();
        let boosted = reranker.apply(results, &query, &SearchOptions::default(), now);
        let mut after: Vec<String> = boosted.iter().map(|r| r.note_id.clone()).collect();

        before.sort();
        after.sort();
        prop_assert_eq!(before, after);
        prop_assert!(boosted.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn boosts_never_lower_scores(results in arb_results()) {
        let reranker = BoostReranker::new(RankingConfig::default());
        let query = parse("alpha tag:beta \"gamma delta\"");
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();

        let original: std::collections::HashMap<String, f32> =
            results.iter().map(|r| (r.note_id.clone(), r.score)).collect();
        for r in reranker.apply(results, &query, &SearchOptions::default(), now) {
            prop_assert!(r.score >= original[&r.note_id]);
        }
    }

    #[test]
    fn diversify_keeps_first_and_never_grows(results in arb_results()) {
        let reranker = BoostReranker::new(RankingConfig::default());
        let ids: Vec<String> = results.iter().map(|r| r.note_id.clone()).collect();
        let diverse = reranker.diversify(results);

        prop_assert!(diverse.len() <= ids.len());
        if !ids.is_empty() {
            prop_assert_eq!(&diverse[0].note_id, &ids[0]);
        }
        // Output is a subsequence of the input.
        let mut cursor = ids.iter();
        for kept in &diverse {
            prop_assert!(cursor.any(|id| id == &kept.note_id));
        }
    }

    #[test]
    fn recency_decays_with_age(days_a in 0i64..3000, extra in 0i64..3000) {
        let reranker = BoostReranker::new(RankingConfig::default());
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let newer = reranker.recency_boost(now - Duration::days(days_a), now);
        let older = reranker.recency_boost(now - Duration::days(days_a + extra), now);
        prop_assert!(newer >= older);
        prop_assert!(older >= 0.0);
    }

    #[test]
    fn future_updates_get_the_full_recency_boost(ahead in 0i64..1000) {
        let config = RankingConfig::default();
        let reranker = BoostReranker::new(config.clone());
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let boost = reranker.recency_boost(now + Duration::days(ahead), now);
        prop_assert!((boost - config.recent_boost).abs() < 1e-6);
    }
}
