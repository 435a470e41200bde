//! Property tests for query parsing and ranking.

mod query_properties;
mod ranking_properties;
