//! `ctxkeep categories` — list the categories and their keywords.

use ctxkeep_agent::CategoryRegistry;

use super::CmdResult;

pub async fn run() -> CmdResult {
    let config = super::load_config()?;
    let registry = CategoryRegistry::from_config(&config.categories);

    println!("🏷  Categories ({})", registry.len());
    println!("================");
    for category in registry.iter() {
        println!("  {:<26} {}", category.name, category.keywords.join(", "));
    }
    println!();
    println!("  Unmatched entities are filed under 'dynamic' as they appear.");

    Ok(())
}
