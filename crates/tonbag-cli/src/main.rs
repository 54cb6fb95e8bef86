//! tonbag CLI
//!
//! Inspect the resolved configuration and the provider drafts kept between
//! sessions.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tonbag_core::ContentKey;

mod handlers;

#[derive(Parser)]
#[command(name = "tonbag")]
#[command(about = "Tonbag storage client - provider tooling")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to the platform config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect or clean up cached provider drafts
    Drafts {
        #[command(subcommand)]
        action: DraftsAction,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub(crate) enum DraftsAction {
    /// List cached drafts, for one content item or all of them
    List {
        /// Content key (64 hex characters)
        content: Option<ContentKey>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Drop drafts older than the configured TTL
    Prune,

    /// Drop every cached draft of a content item
    Clear {
        /// Content key (64 hex characters)
        content: ContentKey,
    },
}

#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,

    /// Validate the configuration and exit
    Check,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = handlers::load_config(cli.config.as_deref())?;

    let log_level = if cli.verbose {
        "debug".to_string()
    } else {
        config.logging.level.clone()
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(log_level))
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Drafts { action } => handlers::drafts::handle_drafts(&config, action).await,
        Commands::Config { action } => handlers::config::handle_config(&config, action),
    }
}
