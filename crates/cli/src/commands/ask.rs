//! `ctxkeep ask` — run one turn of the pipeline.

use std::path::PathBuf;

use ctxkeep_agent::ContextKeeper;
use ctxkeep_config::AppConfig;
use ctxkeep_core::session::SessionId;
use tracing::debug;

use super::CmdResult;

pub async fn run(query: String, session: Option<String>, db: Option<PathBuf>) -> CmdResult {
    let config = super::load_config()?;

    // Local OpenAI-compatible servers accept any key.
    if !config.has_api_key() && config.default_provider != "ollama" {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    CTXKEEP_API_KEY=sk-...   (generic)");
        eprintln!("    OPENAI_API_KEY=sk-...    (for OpenAI direct)");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let store = super::open_store(&config, db.as_deref()).await?;
    let provider = ctxkeep_providers::build_from_config(&config);
    let model = ctxkeep_providers::resolve_model(&config);
    let keeper = ContextKeeper::from_config(provider, store, model.clone(), &config);

    let session = session
        .as_deref()
        .map(SessionId::from)
        .unwrap_or_default();

    debug!(session = %session, model = %model, "Running turn");
    let outcome = keeper.run_turn(&session, &query).await?;
    println!("{}", outcome.reply());
    eprintln!("session: {session}");

    Ok(())
}
