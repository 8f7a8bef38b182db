//! `ctxkeep history` and `ctxkeep key-points` — inspect a stored session.

use std::path::PathBuf;

use ctxkeep_core::memory::{InteractionStore, KeyPointStore};
use ctxkeep_core::session::SessionId;

use super::CmdResult;

pub async fn history(session: String, limit: usize, db: Option<PathBuf>) -> CmdResult {
    let config = super::load_config()?;
    let store = super::open_store(&config, db.as_deref()).await?;
    let session = SessionId::from(&session);

    let total = store.count_interactions(&session).await?;
    let turns = store.recent_interactions(&session, limit).await?;

    println!("📜 Session {session} ({total} turns, showing {})", turns.len());
    println!();

    if turns.is_empty() {
        println!("   No interactions stored for this session.");
        return Ok(());
    }

    // Oldest first reads like the conversation did.
    for turn in turns.iter().rev() {
        println!("  [{}]", turn.created_at.format("%Y-%m-%d %H:%M:%S"));
        println!("  User: {}", turn.user_input);
        println!("  Bot:  {}", turn.model_response);
        println!();
    }

    Ok(())
}

pub async fn key_points(session: String, db: Option<PathBuf>) -> CmdResult {
    let config = super::load_config()?;
    let store = super::open_store(&config, db.as_deref()).await?;
    let session = SessionId::from(&session);

    let summaries = store.list_key_points(&session).await?;
    println!("🗂  Key points for session {session}");
    println!();

    if summaries.is_empty() {
        println!("   Nothing extracted yet. Key points appear after the second turn.");
        return Ok(());
    }

    for summary in summaries {
        println!("  {}:", summary.category);
        for line in summary.summary.lines() {
            println!("    - {line}");
        }
    }

    Ok(())
}
