//! ctxkeep CLI — the main entry point.
//!
//! Commands:
//! - `ask`         — Run one turn (new session unless `--session` is given)
//! - `history`     — Show a session's stored turns
//! - `key-points`  — Show a session's extracted key points
//! - `categories`  — List categories and keywords
//! - `onboard`     — Initialize config
//! - `doctor`      — Diagnose config and storage

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "ctxkeep",
    about = "ctxkeep — context-keeping assistant for software engineering questions",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use this SQLite database instead of the configured store
    #[arg(long, global = true, env = "CTXKEEP_DB")]
    db: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a question, carrying context from earlier turns of the session
    Ask {
        /// The question
        query: String,

        /// Continue an existing session
        #[arg(short, long)]
        session: Option<String>,
    },

    /// Show the most recent turns of a session
    History {
        #[arg(short, long)]
        session: String,

        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },

    /// Show the key points extracted for a session
    KeyPoints {
        #[arg(short, long)]
        session: String,
    },

    /// List categories and their keywords
    Categories,

    /// Initialize configuration
    Onboard,

    /// Diagnose system health
    Doctor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Ask { query, session } => commands::ask::run(query, session, cli.db).await?,
        Commands::History { session, limit } => {
            commands::session::history(session, limit, cli.db).await?
        }
        Commands::KeyPoints { session } => commands::session::key_points(session, cli.db).await?,
        Commands::Categories => commands::categories::run().await?,
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Doctor => commands::doctor::run(cli.db).await?,
    }

    Ok(())
}
