//! Store traits — the persisted side of the context manager.
//!
//! Two logical tables back every session:
//! - **interactions**: an append-only log of `(user input, model response)` turns
//! - **key points**: one cumulative summary per `(session, category)` pair
//!
//! Implementations: SQLite (persistent) and in-memory (tests, ephemeral runs).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::error::MemoryError;
use crate::session::SessionId;

/// One stored conversational turn. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    /// Monotonic row id; defines recency when timestamps tie.
    pub id: i64,

    pub session_id: SessionId,

    pub user_input: String,

    pub model_response: String,

    pub created_at: DateTime<Utc>,
}

/// Accumulated summary text for one category within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyPointSummary {
    pub session_id: SessionId,
    pub category: String,
    pub summary: String,
}

/// Append-only interaction log.
#[async_trait]
pub trait InteractionStore: Send + Sync {
    /// The backend name (e.g., "sqlite", "in_memory").
    fn name(&self) -> &str;

    /// Append a new turn for the session.
    async fn store_interaction(
        &self,
        session: &SessionId,
        user_input: &str,
        model_response: &str,
    ) -> std::result::Result<(), MemoryError>;

    /// The most recent `limit` turns for the session, newest first.
    async fn recent_interactions(
        &self,
        session: &SessionId,
        limit: usize,
    ) -> std::result::Result<Vec<Interaction>, MemoryError>;

    /// Number of turns stored for the session.
    async fn count_interactions(&self, session: &SessionId) -> std::result::Result<usize, MemoryError>;
}

/// Per-(session, category) summary storage with upsert semantics.
#[async_trait]
pub trait KeyPointStore: Send + Sync {
    /// Stored summary, or the empty string when the pair has none.
    async fn get_key_points(
        &self,
        session: &SessionId,
        category: &str,
    ) -> std::result::Result<String, MemoryError>;

    /// Insert or overwrite the summary for the pair.
    async fn store_key_points(
        &self,
        session: &SessionId,
        category: &str,
        summary: &str,
    ) -> std::result::Result<(), MemoryError>;

    /// Atomically append `new_points` on a new line (or set it when no prior
    /// summary exists) and return the updated summary.
    ///
    /// Must not lose updates under concurrent callers for the same pair.
    async fn append_key_points(
        &self,
        session: &SessionId,
        category: &str,
        new_points: &str,
    ) -> std::result::Result<String, MemoryError>;

    /// Every summary recorded for the session, ordered by category name.
    async fn list_key_points(
        &self,
        session: &SessionId,
    ) -> std::result::Result<Vec<KeyPointSummary>, MemoryError>;
}

/// A backend that provides both tables.
pub trait ContextStore: InteractionStore + KeyPointStore {}

impl<T: InteractionStore + KeyPointStore> ContextStore for T {}

/// Join a prior summary and new points the way every backend must.
pub fn merge_summary(current: &str, new_points: &str) -> String {
    if current.is_empty() {
        new_points.to_string()
    } else {
        format!("{current}\n{new_points}")
    }
}
