//! SQLite backend for interactions and key-point summaries.
//!
//! Uses a single SQLite database file with two tables:
//! - `interactions` — append-only turn log, ordered by its integer rowid
//! - `key_points` — one summary per `(session_id, category)`, unique on the pair
//!
//! Appending to a summary is a single `INSERT … ON CONFLICT DO UPDATE`
//! statement, so concurrent appends to the same pair cannot lose updates.

use async_trait::async_trait;
use chrono::Utc;
use ctxkeep_core::error::MemoryError;
use ctxkeep_core::memory::{Interaction, InteractionStore, KeyPointStore, KeyPointSummary};
use ctxkeep_core::session::SessionId;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

/// A SQLite store implementing both context tables.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) a store at a SQLite URL.
    ///
    /// The database and all tables/indexes are created automatically.
    /// Pass `"sqlite::memory:"` for an in-process ephemeral database (useful for tests).
    pub async fn new(url: &str) -> Result<Self, MemoryError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| MemoryError::Storage(format!("Invalid SQLite path: {e}")))?;
        Self::connect(options, url.contains(":memory:"), url).await
    }

    /// Open a store backed by a file on disk, creating parent directories.
    pub async fn open_file(path: &Path) -> Result<Self, MemoryError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                MemoryError::Storage(format!("Cannot create {}: {e}", parent.display()))
            })?;
        }
        let options = SqliteConnectOptions::new().filename(path);
        Self::connect(options, false, &path.display().to_string()).await
    }

    async fn connect(
        options: SqliteConnectOptions,
        in_memory: bool,
        label: &str,
    ) -> Result<Self, MemoryError> {
        let mut options = options
            .create_if_missing(true)
            .synchronous(SqliteSynchronous::Normal);
        if !in_memory {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        // Every connection to `:memory:` is a separate database, so the pool
        // must hold exactly one long-lived connection.
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(4)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| MemoryError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite context store initialized at {label}");
        Ok(store)
    }

    /// Run schema migrations — creates both tables and their indexes.
    async fn run_migrations(&self) -> Result<(), MemoryError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS interactions (
                id             INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id     TEXT NOT NULL,
                user_input     TEXT NOT NULL,
                model_response TEXT NOT NULL,
                created_at     TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::MigrationFailed(format!("interactions table: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_interactions_session ON interactions(session_id, id DESC)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::MigrationFailed(format!("interactions index: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS key_points (
                session_id TEXT NOT NULL,
                category   TEXT NOT NULL,
                summary    TEXT NOT NULL DEFAULT '',
                UNIQUE(session_id, category)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::MigrationFailed(format!("key_points table: {e}")))?;

        debug!("SQLite migrations complete");
        Ok(())
    }

    /// Parse an `Interaction` from a SQLite row.
    fn row_to_interaction(row: &sqlx::sqlite::SqliteRow) -> Result<Interaction, MemoryError> {
        let id: i64 = row
            .try_get("id")
            .map_err(|e| MemoryError::QueryFailed(format!("id column: {e}")))?;
        let session_id: String = row
            .try_get("session_id")
            .map_err(|e| MemoryError::QueryFailed(format!("session_id column: {e}")))?;
        let user_input: String = row
            .try_get("user_input")
            .map_err(|e| MemoryError::QueryFailed(format!("user_input column: {e}")))?;
        let model_response: String = row
            .try_get("model_response")
            .map_err(|e| MemoryError::QueryFailed(format!("model_response column: {e}")))?;
        let created_at_str: String = row
            .try_get("created_at")
            .map_err(|e| MemoryError::QueryFailed(format!("created_at column: {e}")))?;

        let created_at = chrono::DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Ok(Interaction {
            id,
            session_id: SessionId(session_id),
            user_input,
            model_response,
            created_at,
        })
    }
}

#[async_trait]
impl InteractionStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn store_interaction(
        &self,
        session: &SessionId,
        user_input: &str,
        model_response: &str,
    ) -> Result<(), MemoryError> {
        sqlx::query(
            r#"
            INSERT INTO interactions (session_id, user_input, model_response, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(session.as_str())
        .bind(user_input)
        .bind(model_response)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::Storage(format!("INSERT interaction failed: {e}")))?;

        debug!(session = %session, "Stored interaction");
        Ok(())
    }

    async fn recent_interactions(
        &self,
        session: &SessionId,
        limit: usize,
    ) -> Result<Vec<Interaction>, MemoryError> {
        let rows = sqlx::query(
            r#"
            SELECT id, session_id, user_input, model_response, created_at
            FROM interactions
            WHERE session_id = ?1
            ORDER BY id DESC
            LIMIT ?2
            "#,
        )
        .bind(session.as_str())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| MemoryError::QueryFailed(format!("Recent interactions: {e}")))?;

        rows.iter().map(Self::row_to_interaction).collect()
    }

    async fn count_interactions(&self, session: &SessionId) -> Result<usize, MemoryError> {
        let row = sqlx::query("SELECT COUNT(*) AS cnt FROM interactions WHERE session_id = ?1")
            .bind(session.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| MemoryError::QueryFailed(format!("COUNT: {e}")))?;

        let cnt: i64 = row
            .try_get("cnt")
            .map_err(|e| MemoryError::QueryFailed(format!("cnt column: {e}")))?;

        Ok(cnt as usize)
    }
}

#[async_trait]
impl KeyPointStore for SqliteStore {
    async fn get_key_points(
        &self,
        session: &SessionId,
        category: &str,
    ) -> Result<String, MemoryError> {
        let row = sqlx::query("SELECT summary FROM key_points WHERE session_id = ?1 AND category = ?2")
            .bind(session.as_str())
            .bind(category)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| MemoryError::QueryFailed(format!("GET key points: {e}")))?;

        match row {
            Some(r) => r
                .try_get("summary")
                .map_err(|e| MemoryError::QueryFailed(format!("summary column: {e}"))),
            None => Ok(String::new()),
        }
    }

    async fn store_key_points(
        &self,
        session: &SessionId,
        category: &str,
        summary: &str,
    ) -> Result<(), MemoryError> {
        sqlx::query(
            r#"
            INSERT INTO key_points (session_id, category, summary)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(session_id, category) DO UPDATE SET summary = excluded.summary
            "#,
        )
        .bind(session.as_str())
        .bind(category)
        .bind(summary)
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::Storage(format!("UPSERT key points failed: {e}")))?;

        debug!(session = %session, category, "Stored key points");
        Ok(())
    }

    async fn append_key_points(
        &self,
        session: &SessionId,
        category: &str,
        new_points: &str,
    ) -> Result<String, MemoryError> {
        let row = sqlx::query(
            r#"
            INSERT INTO key_points (session_id, category, summary)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(session_id, category) DO UPDATE SET summary =
                CASE WHEN key_points.summary = '' THEN excluded.summary
                     ELSE key_points.summary || char(10) || excluded.summary
                END
            RETURNING summary
            "#,
        )
        .bind(session.as_str())
        .bind(category)
        .bind(new_points)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| MemoryError::Storage(format!("APPEND key points failed: {e}")))?;

        let summary: String = row
            .try_get("summary")
            .map_err(|e| MemoryError::QueryFailed(format!("summary column: {e}")))?;

        debug!(session = %session, category, "Appended key points");
        Ok(summary)
    }

    async fn list_key_points(
        &self,
        session: &SessionId,
    ) -> Result<Vec<KeyPointSummary>, MemoryError> {
        let rows = sqlx::query(
            "SELECT category, summary FROM key_points WHERE session_id = ?1 ORDER BY category",
        )
        .bind(session.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| MemoryError::QueryFailed(format!("LIST key points: {e}")))?;

        rows.iter()
            .map(|row| {
                let category: String = row
                    .try_get("category")
                    .map_err(|e| MemoryError::QueryFailed(format!("category column: {e}")))?;
                let summary: String = row
                    .try_get("summary")
                    .map_err(|e| MemoryError::QueryFailed(format!("summary column: {e}")))?;
                Ok(KeyPointSummary {
                    session_id: session.clone(),
                    category,
                    summary,
                })
            })
            .collect()
    }
}
