//! Tag and date retrieval.
//!
//! Both paths return notes newest first with a base score of 1.0, leaving
//! ordering changes to the boost reranker.

use std::collections::HashSet;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use tracing::debug;

use crate::error::{Result, SearchError};
use crate::search::filters::PathFilter;
use crate::search::fulltext::result_for_entry;
use crate::search::query::{DateModifier, DateRange, ParsedQuery};
use crate::search::types::{MatchType, NoteIndexEntry, SearchOptions, SearchResult};
use crate::storage::TextIndex;

const BASE_SCORE: f32 = 1.0;

/// Lower sentinel for open-ended ranges (0001-01-01).
#[must_use]
pub fn distant_past() -> DateTime<Utc> {
    midnight_utc(NaiveDate::from_ymd_opt(1, 1, 1)).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Upper sentinel for open-ended ranges (4001-01-01).
#[must_use]
pub fn distant_future() -> DateTime<Utc> {
    midnight_utc(NaiveDate::from_ymd_opt(4001, 1, 1)).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

fn midnight_utc(date: Option<NaiveDate>) -> Option<DateTime<Utc>> {
    date.and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Resolve a range to concrete `[start, end)` bounds. Calendar keywords
/// use the day, week (Monday first), month or year boundaries of `now`'s
/// time zone.
pub fn resolve_date_range<Tz: TimeZone>(
    range: &DateRange,
    now: &DateTime<Tz>,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let now_utc = now.with_timezone(&Utc);
    let today = now.date_naive();
    let tz = now.timezone();
    let local_midnight = |date: NaiveDate| start_of_day(&tz, date);

    match range.modifier {
        DateModifier::Today => (local_midnight(today), now_utc),
        DateModifier::Yesterday => {
            let yesterday = today.pred_opt().unwrap_or(today);
            (local_midnight(yesterday), local_midnight(today))
        }
        DateModifier::ThisWeek => {
            let offset = i64::from(today.weekday().num_days_from_monday());
            (local_midnight(today - Duration::days(offset)), now_utc)
        }
        DateModifier::ThisMonth => (local_midnight(today.with_day(1).unwrap_or(today)), now_utc),
        DateModifier::ThisYear => (
            local_midnight(NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today)),
            now_utc,
        ),
        DateModifier::Before | DateModifier::After | DateModifier::Range => (
            range.start.unwrap_or_else(distant_past),
            range.end.unwrap_or_else(distant_future),
        ),
    }
}

fn start_of_day<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    let naive: NaiveDateTime = date.and_hms_opt(0, 0, 0).unwrap_or_default();
    tz.from_local_datetime(&naive)
        .earliest()
        .map_or_else(|| naive.and_utc(), |local| local.with_timezone(&Utc))
}

/// Tag retrieval: each tag filter (or each plain term when there are no
/// tags) is a case-insensitive substring match against each stored tag.
/// Duplicates keep their first occurrence. `in:` paths scope the lookup.
pub fn search_tags(
    index: &dyn TextIndex,
    query: &ParsedQuery,
    options: &SearchOptions,
) -> Result<Vec<SearchResult>> {
    let needles: Vec<String> = if query.tags.is_empty() {
        query.term_texts().map(str::to_lowercase).collect()
    } else {
        query.tags.iter().cloned().collect()
    };

    let paths = PathFilter::from_query(query);

    let mut seen = HashSet::new();
    let mut entries: Vec<NoteIndexEntry> = Vec::new();
    for needle in &needles {
        let found = index
            .search_tag(needle, &paths)
            .map_err(|err| err.for_path(SearchError::TagSearchFailed))?;
        for entry in found {
            if seen.insert(entry.note_id.clone()) {
                entries.push(entry);
            }
        }
    }
    entries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

    debug!(tags = needles.len(), results = entries.len(), "tag search");
    Ok(paginate(entries, query, options, MatchType::Tag))
}

/// Date retrieval over `[start, end)`, scoped to the query's `in:` paths.
/// Without a date range every note matches.
pub fn search_dates<Tz: TimeZone>(
    index: &dyn TextIndex,
    query: &ParsedQuery,
    options: &SearchOptions,
    now: &DateTime<Tz>,
) -> Result<Vec<SearchResult>> {
    let range = query.date_range.unwrap_or(DateRange {
        start: None,
        end: None,
        modifier: DateModifier::Range,
    });
    let (start, end) = resolve_date_range(&range, now);

    let mut entries = index
        .search_updated_between(start, end, &PathFilter::from_query(query))
        .map_err(|err| err.for_path(SearchError::DateSearchFailed))?;
    entries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

    debug!(%start, %end, results = entries.len(), "date search");
    Ok(paginate(entries, query, options, MatchType::Date))
}

fn paginate(
    entries: Vec<NoteIndexEntry>,
    query: &ParsedQuery,
    options: &SearchOptions,
    match_type: MatchType,
) -> Vec<SearchResult> {
    entries
        .iter()
        .skip(options.offset)
        .take(options.limit)
        .map(|entry| result_for_entry(entry, query, options, BASE_SCORE, match_type))
        .collect()
}
