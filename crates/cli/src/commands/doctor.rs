//! `ctxkeep doctor` — Diagnose configuration and storage.

use std::path::PathBuf;

use ctxkeep_config::AppConfig;
use ctxkeep_core::memory::InteractionStore;
use ctxkeep_core::provider::Provider;

use super::CmdResult;

pub async fn run(db: Option<PathBuf>) -> CmdResult {
    println!("🩺 ctxkeep Doctor — System Diagnostics");
    println!("======================================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    if !config_path.exists() {
        println!("  ⚠️  No config file — using defaults (run `ctxkeep onboard`)");
        issues += 1;
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ Config file invalid: {e}");
            println!("\n  ⚠️  1 blocking issue found.");
            return Ok(());
        }
    };

    println!(
        "  ✅ Provider: {} (model {})",
        config.default_provider,
        ctxkeep_providers::resolve_model(&config)
    );

    if config.has_api_key() {
        println!("  ✅ API key configured");
    } else {
        println!("  ⚠️  No API key configured — set CTXKEEP_API_KEY or add api_key to config.toml");
        issues += 1;
    }

    let provider = ctxkeep_providers::build_from_config(&config);
    match provider.health_check().await {
        Ok(true) => println!("  ✅ Provider reachable ({})", provider.name()),
        Ok(false) => {
            println!("  ⚠️  Provider {} answered but rejected the check (API key?)", provider.name());
            issues += 1;
        }
        Err(e) => {
            println!("  ❌ Provider unreachable: {e}");
            issues += 1;
        }
    }

    match super::open_store(&config, db.as_deref()).await {
        Ok(store) => println!("  ✅ Store opened ({})", store.name()),
        Err(e) => {
            println!("  ❌ Store unavailable: {e}");
            issues += 1;
        }
    }

    println!(
        "  ✅ Word limit {} / history {} turns",
        config.context.word_limit, config.context.history_limit
    );

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
