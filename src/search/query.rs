//! Query parsing
//!
//! Operators are pulled out of the raw text by an ordered table of
//! extraction rules. Each rule records what it matched and blanks the
//! matched text before the next rule runs, so later rules never see
//! consumed syntax:
//!
//! ```text
//! tag:<t>  →  in:<p>  →  date:<kw>  →  before:<d>  →  after:<d>  →  from:/to:  →  plain terms
//! ```
//!
//! `AND`, `OR` and `NOT` are treated as separators only; no boolean tree
//! is built.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, Utc};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\btag:(\S+)").expect("valid tag regex"));
static IN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bin:(\S+)").expect("valid in regex"));
static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bdate:(?:"([^"]*)"|(this\s+(?:week|month|year))\b|(\S+))"#)
        .expect("valid date regex")
});
static BEFORE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bbefore:(\S+)").expect("valid before regex"));
static AFTER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bafter:(\S+)").expect("valid after regex"));
static FROM_TO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(from|to):(\S+)").expect("valid from/to regex"));
static DANGLING_OPERATOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:tag|in|date|before|after|from|to):").expect("valid operator regex")
});

static QMD_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s)#([\p{L}\p{N}_/-]+)").expect("valid qmd tag regex"));
static QMD_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[([^\]]+)\]\]").expect("valid qmd link regex"));
static QMD_AUX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s)[\^-](\S+)").expect("valid qmd aux regex"));

const BOOLEAN_KEYWORDS: [&str; 3] = ["AND", "OR", "NOT"];

/// Retrieval mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SearchMode {
    FullText,
    Semantic,
    Hybrid,
    Tag,
    Date,
    #[default]
    Auto,
}

impl SearchMode {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::FullText => "full-text",
            Self::Semantic => "semantic",
            Self::Hybrid => "hybrid",
            Self::Tag => "tag",
            Self::Date => "date",
            Self::Auto => "auto",
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "full-text" | "fulltext" | "text" | "fts" => Ok(Self::FullText),
            "semantic" | "vector" => Ok(Self::Semantic),
            "hybrid" => Ok(Self::Hybrid),
            "tag" | "tags" => Ok(Self::Tag),
            "date" => Ok(Self::Date),
            "auto" => Ok(Self::Auto),
            other => Err(format!(
                "unknown search mode '{other}' (expected full-text, semantic, hybrid, tag, date or auto)"
            )),
        }
    }
}

/// How a date range was expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DateModifier {
    Today,
    Yesterday,
    ThisWeek,
    ThisMonth,
    ThisYear,
    Before,
    After,
    Range,
}

impl DateModifier {
    /// Map a `date:` keyword. Case, whitespace, `-` and `_` are ignored.
    /// `today` maps to [`Self::Today`] (start of the current day to now).
    #[must_use]
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        let normalized: String = keyword
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
            .collect::<String>()
            .to_lowercase();

        match normalized.as_str() {
            "today" => Some(Self::Today),
            "yesterday" => Some(Self::Yesterday),
            "thisweek" | "week" => Some(Self::ThisWeek),
            "thismonth" | "month" => Some(Self::ThisMonth),
            "thisyear" | "year" => Some(Self::ThisYear),
            _ => None,
        }
    }
}

/// A date filter. Bounds are set for `Before`, `After` and `Range`;
/// keyword modifiers are resolved against the clock at search time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub modifier: DateModifier,
}

impl DateRange {
    #[must_use]
    pub const fn keyword(modifier: DateModifier) -> Self {
        Self {
            start: None,
            end: None,
            modifier,
        }
    }

    #[must_use]
    pub const fn before(end: DateTime<Utc>) -> Self {
        Self {
            start: None,
            end: Some(end),
            modifier: DateModifier::Before,
        }
    }

    #[must_use]
    pub const fn after(start: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: None,
            modifier: DateModifier::After,
        }
    }
}

/// A plain search term.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "lowercase")]
pub enum PlainTerm {
    Word(String),
    /// Quoted text matched as a unit.
    Phrase(String),
}

impl PlainTerm {
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Word(text) | Self::Phrase(text) => text,
        }
    }

    #[must_use]
    pub const fn is_phrase(&self) -> bool {
        matches!(self, Self::Phrase(_))
    }
}

impl fmt::Display for PlainTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Word(text) => f.write_str(text),
            Self::Phrase(text) => write!(f, "\"{text}\""),
        }
    }
}

/// Structured form of a query string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedQuery {
    pub raw: String,
    pub terms: Vec<PlainTerm>,
    pub tags: BTreeSet<String>,
    pub paths: BTreeSet<String>,
    pub date_range: Option<DateRange>,
    /// Raw operator values by key, for diagnostics.
    pub operators: BTreeMap<String, Vec<String>>,
    /// `[[wikilinks]]` captured by [`parse_qmd`].
    pub links: Vec<String>,
    /// `^term` / `-term` values captured by [`parse_qmd`]. These are also
    /// appended to `terms`.
    pub auxiliary_terms: Vec<String>,
}

impl ParsedQuery {
    /// No terms, tags, paths or date range.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
            && self.tags.is_empty()
            && self.paths.is_empty()
            && self.date_range.is_none()
    }

    /// Term texts in query order, phrases unquoted.
    pub fn term_texts(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().map(PlainTerm::text)
    }

    pub fn phrases(&self) -> impl Iterator<Item = &str> {
        self.terms
            .iter()
            .filter(|term| term.is_phrase())
            .map(PlainTerm::text)
    }

    /// Plain terms re-rendered as query text (phrases keep their quotes).
    #[must_use]
    pub fn joined_terms(&self) -> String {
        self.terms
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Text sent to the embedding provider.
    #[must_use]
    pub fn embedding_text(&self) -> String {
        self.term_texts().collect::<Vec<_>>().join(" ")
    }

    fn record(&mut self, key: &str, value: &str) {
        self.operators
            .entry(key.to_string())
            .or_default()
            .push(value.to_string());
    }
}

#[derive(Default)]
struct Extraction {
    query: ParsedQuery,
    date_seen: bool,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
}

struct ExtractionRule {
    pattern: &'static LazyLock<Regex>,
    apply: fn(&mut Extraction, &Captures<'_>),
    finish: Option<fn(&mut Extraction)>,
}

/// Extraction order is fixed; see the module docs.
static RULES: [ExtractionRule; 6] = [
    ExtractionRule {
        pattern: &TAG_RE,
        apply: extract_tag,
        finish: None,
    },
    ExtractionRule {
        pattern: &IN_RE,
        apply: extract_path,
        finish: None,
    },
    ExtractionRule {
        pattern: &DATE_RE,
        apply: extract_date_keyword,
        finish: None,
    },
    ExtractionRule {
        pattern: &BEFORE_RE,
        apply: extract_before,
        finish: None,
    },
    ExtractionRule {
        pattern: &AFTER_RE,
        apply: extract_after,
        finish: None,
    },
    ExtractionRule {
        pattern: &FROM_TO_RE,
        apply: extract_from_to,
        finish: Some(finish_from_to),
    },
];

fn extract_tag(state: &mut Extraction, caps: &Captures<'_>) {
    let raw = &caps[1];
    state.query.record("tag", raw);
    let tag = raw.trim_start_matches('#').to_lowercase();
    if !tag.is_empty() {
        state.query.tags.insert(tag);
    }
}

fn extract_path(state: &mut Extraction, caps: &Captures<'_>) {
    let raw = &caps[1];
    state.query.record("in", raw);
    state.query.paths.insert(raw.to_string());
}

fn extract_date_keyword(state: &mut Extraction, caps: &Captures<'_>) {
    let Some(value) = caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3)) else {
        return;
    };
    state.query.record("date", value.as_str());
    if state.date_seen {
        return;
    }
    state.date_seen = true;
    if let Some(modifier) = DateModifier::from_keyword(value.as_str()) {
        state.query.date_range = Some(DateRange::keyword(modifier));
    }
}

fn extract_before(state: &mut Extraction, caps: &Captures<'_>) {
    let raw = &caps[1];
    state.query.record("before", raw);
    if let Some(date) = parse_iso_date(raw) {
        state.query.date_range = Some(DateRange::before(date));
    }
}

fn extract_after(state: &mut Extraction, caps: &Captures<'_>) {
    let raw = &caps[1];
    state.query.record("after", raw);
    if let Some(date) = parse_iso_date(raw) {
        state.query.date_range = Some(DateRange::after(date));
    }
}

fn extract_from_to(state: &mut Extraction, caps: &Captures<'_>) {
    let key = caps[1].to_lowercase();
    let raw = &caps[2];
    state.query.record(&key, raw);
    let Some(date) = parse_iso_date(raw) else {
        return;
    };
    if key == "from" {
        state.from = Some(date);
    } else {
        // `to:` names an inclusive day; the range end is exclusive.
        state.to = Some(date + chrono::Duration::days(1));
    }
}

fn finish_from_to(state: &mut Extraction) {
    if state.from.is_some() || state.to.is_some() {
        state.query.date_range = Some(DateRange {
            start: state.from,
            end: state.to,
            modifier: DateModifier::Range,
        });
    }
}

/// Parse `YYYY-MM-DD` as midnight UTC.
#[must_use]
pub fn parse_iso_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim().trim_matches('"');
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Parse a raw query string. Pure and deterministic.
#[must_use]
pub fn parse(raw: &str) -> ParsedQuery {
    let mut state = Extraction {
        query: ParsedQuery {
            raw: raw.to_string(),
            ..ParsedQuery::default()
        },
        ..Extraction::default()
    };

    let mut remaining = raw.to_string();
    for rule in &RULES {
        for caps in rule.pattern.captures_iter(&remaining) {
            (rule.apply)(&mut state, &caps);
        }
        if let Some(finish) = rule.finish {
            finish(&mut state);
        }
        remaining = rule.pattern.replace_all(&remaining, " ").into_owned();
    }

    let remaining = DANGLING_OPERATOR_RE.replace_all(&remaining, " ");
    state.query.terms = split_plain_terms(&remaining);
    state.query
}

/// Parse the alternate grammar: `#tag`, `[[link]]`, `^term` and `-term`
/// on top of [`parse`].
///
/// `^term` and `-term` are both folded into the plain terms; neither
/// excludes anything.
#[must_use]
pub fn parse_qmd(raw: &str) -> ParsedQuery {
    let mut tags = Vec::new();
    let mut links = Vec::new();
    let mut auxiliary = Vec::new();

    for caps in QMD_LINK_RE.captures_iter(raw) {
        links.push(caps[1].trim().to_string());
    }
    let remaining = QMD_LINK_RE.replace_all(raw, " ");

    for caps in QMD_TAG_RE.captures_iter(&remaining) {
        tags.push(caps[1].to_lowercase());
    }
    let remaining = QMD_TAG_RE.replace_all(&remaining, " ");

    for caps in QMD_AUX_RE.captures_iter(&remaining) {
        let term = caps[1].replace('"', "");
        if !term.is_empty() {
            auxiliary.push(term);
        }
    }
    let remaining = QMD_AUX_RE.replace_all(&remaining, " ");

    let mut query = parse(&remaining);
    query.raw = raw.to_string();

    for tag in tags {
        query.record("tag", &tag);
        query.tags.insert(tag);
    }
    for link in &links {
        query.record("link", link);
    }
    query.links = links;
    for term in &auxiliary {
        query.record("aux", term);
        query.terms.push(PlainTerm::Word(term.clone()));
    }
    query.auxiliary_terms = auxiliary;
    query
}

/// Pick a retrieval mode from the shape of a parsed query.
#[must_use]
pub fn detect_search_mode(query: &ParsedQuery) -> SearchMode {
    let has_terms = !query.terms.is_empty();
    let has_tags = !query.tags.is_empty();
    let has_date = query.date_range.is_some();
    let has_paths = !query.paths.is_empty();

    if has_terms {
        return SearchMode::Hybrid;
    }
    match (has_tags, has_date, has_paths) {
        (true, false, _) => SearchMode::Tag,
        (false, true, _) => SearchMode::Date,
        (false, false, true) => SearchMode::FullText,
        _ => SearchMode::Hybrid,
    }
}

fn split_plain_terms(text: &str) -> Vec<PlainTerm> {
    let mut terms = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find('"') {
        push_words(&rest[..open], &mut terms);
        let after_open = &rest[open + 1..];
        match after_open.find('"') {
            Some(close) => {
                let phrase = after_open[..close]
                    .split_whitespace()
                    .collect::<Vec<_>>()
                    .join(" ");
                if !phrase.is_empty() {
                    terms.push(PlainTerm::Phrase(phrase));
                }
                rest = &after_open[close + 1..];
            }
            None => {
                // Unbalanced quote: drop it and keep the words.
                rest = after_open;
            }
        }
    }
    push_words(rest, &mut terms);
    terms
}

fn push_words(text: &str, terms: &mut Vec<PlainTerm>) {
    for word in text.split_whitespace() {
        if BOOLEAN_KEYWORDS.contains(&word) {
            continue;
        }
        let word = word.replace('"', "");
        if !word.is_empty() {
            terms.push(PlainTerm::Word(word));
        }
    }
}
