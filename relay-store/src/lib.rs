//! Append-only history of published posts.
//!
//! The history lives in one JSON file that is read once at start-up, kept in
//! memory for the run and rewritten by [`HistoryStore::flush`].
pub mod history;

pub use history::{HistoryStore, PersistedState, PublishRecord, TIMESTAMP_FORMAT};
