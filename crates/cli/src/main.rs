//! freeagent CLI: the main entry point.
//!
//! Commands:
//! - `run`       Live one session and persist its record
//! - `sessions`  Show recent session summaries
//! - `memories`  List or search stored memories
//! - `tools`     Print the tool catalog the model sees

use clap::{Parser, Subcommand};
use freeagent_config::AppConfig;
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "freeagent",
    about = "freeagent: an autonomous agent that lives one session at a time",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: ~/.freeagent/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one session
    Run {
        /// Override the turn budget
        #[arg(long)]
        max_turns: Option<u32>,
    },

    /// Show recent session summaries
    Sessions {
        /// How many sessions to show
        #[arg(short = 'n', long, default_value_t = 5)]
        limit: usize,
    },

    /// List the strongest memories, or search them
    Memories {
        /// Only memories whose content or category contains this text
        #[arg(short, long)]
        query: Option<String>,

        /// How many memories to show
        #[arg(short = 'n', long, default_value_t = 20)]
        limit: usize,
    },

    /// Print the tool catalog as JSON
    Tools,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run { max_turns } => commands::run::run(config, max_turns).await?,
        Commands::Sessions { limit } => commands::sessions::run(&config, limit).await?,
        Commands::Memories { query, limit } => {
            commands::memories::run(&config, query.as_deref(), limit).await?
        }
        Commands::Tools => commands::tools::run(&config)?,
    }

    Ok(())
}
