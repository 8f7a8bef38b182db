//! Subcommand implementations.

pub mod ask;
pub mod categories;
pub mod doctor;
pub mod onboard;
pub mod session;

use std::path::Path;
use std::sync::Arc;

use ctxkeep_config::AppConfig;
use ctxkeep_core::memory::ContextStore;
use ctxkeep_memory::{InMemoryStore, SqliteStore};

pub type CmdResult = Result<(), Box<dyn std::error::Error>>;

pub fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    Ok(AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?)
}

/// Open the configured store. `--db` always selects SQLite at that path.
pub async fn open_store(
    config: &AppConfig,
    db: Option<&Path>,
) -> Result<Arc<dyn ContextStore>, Box<dyn std::error::Error>> {
    if let Some(path) = db {
        return Ok(Arc::new(SqliteStore::open_file(path).await?));
    }

    match config.memory.backend.as_str() {
        "in_memory" => Ok(Arc::new(InMemoryStore::new())),
        "sqlite" => {
            let path = config.memory.resolved_path();
            Ok(Arc::new(SqliteStore::open_file(&path).await?))
        }
        other => Err(format!("Unknown memory backend '{other}' (expected sqlite or in_memory)").into()),
    }
}
