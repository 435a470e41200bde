//! End-to-end scenarios for notesift.
//!
//! Each scenario runs in an isolated temp directory with its own config and
//! index database. Run with `--nocapture` to see the step log.

mod fixture;
mod indexing_workflow;
mod search_workflow;
