//! In-memory store — useful for testing and ephemeral sessions.

use async_trait::async_trait;
use chrono::Utc;
use ctxkeep_core::error::MemoryError;
use ctxkeep_core::memory::{
    merge_summary, Interaction, InteractionStore, KeyPointStore, KeyPointSummary,
};
use ctxkeep_core::session::SessionId;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// An in-memory store keeping interactions in a Vec and summaries in a map.
/// Useful for testing and sessions where persistence isn't needed.
pub struct InMemoryStore {
    interactions: Arc<RwLock<Vec<Interaction>>>,
    key_points: Arc<RwLock<BTreeMap<(SessionId, String), String>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            interactions: Arc::new(RwLock::new(Vec::new())),
            key_points: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InteractionStore for InMemoryStore {
    fn name(&self) -> &str { "in_memory" }

    async fn store_interaction(
        &self,
        session: &SessionId,
        user_input: &str,
        model_response: &str,
    ) -> Result<(), MemoryError> {
        let mut interactions = self.interactions.write().await;
        let id = interactions.len() as i64 + 1;
        interactions.push(Interaction {
            id,
            session_id: session.clone(),
            user_input: user_input.to_string(),
            model_response: model_response.to_string(),
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn recent_interactions(
        &self,
        session: &SessionId,
        limit: usize,
    ) -> Result<Vec<Interaction>, MemoryError> {
        let interactions = self.interactions.read().await;
        Ok(interactions
            .iter()
            .rev()
            .filter(|i| &i.session_id == session)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn count_interactions(&self, session: &SessionId) -> Result<usize, MemoryError> {
        let interactions = self.interactions.read().await;
        Ok(interactions.iter().filter(|i| &i.session_id == session).count())
    }
}

#[async_trait]
impl KeyPointStore for InMemoryStore {
    async fn get_key_points(
        &self,
        session: &SessionId,
        category: &str,
    ) -> Result<String, MemoryError> {
        let key_points = self.key_points.read().await;
        Ok(key_points
            .get(&(session.clone(), category.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn store_key_points(
        &self,
        session: &SessionId,
        category: &str,
        summary: &str,
    ) -> Result<(), MemoryError> {
        self.key_points
            .write()
            .await
            .insert((session.clone(), category.to_string()), summary.to_string());
        Ok(())
    }

    async fn append_key_points(
        &self,
        session: &SessionId,
        category: &str,
        new_points: &str,
    ) -> Result<String, MemoryError> {
        // Read and write under one write guard so appends cannot interleave.
        let mut key_points = self.key_points.write().await;
        let entry = key_points
            .entry((session.clone(), category.to_string()))
            .or_default();
        *entry = merge_summary(entry, new_points);
        Ok(entry.clone())
    }

    async fn list_key_points(
        &self,
        session: &SessionId,
    ) -> Result<Vec<KeyPointSummary>, MemoryError> {
        let key_points = self.key_points.read().await;
        Ok(key_points
            .iter()
            .filter(|((s, _), _)| s == session)
            .map(|((s, category), summary)| KeyPointSummary {
                session_id: s.clone(),
                category: category.clone(),
                summary: summary.clone(),
            })
            .collect())
    }
}
