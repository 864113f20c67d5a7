//! Subcommand implementations.

pub mod memories;
pub mod run;
pub mod sessions;
pub mod tools;

use anyhow::Context;
use freeagent_config::AppConfig;
use freeagent_memory::SqliteStore;

/// Open the configured SQLite store, creating it on first use.
async fn open_store(config: &AppConfig) -> anyhow::Result<SqliteStore> {
    let path = &config.storage.db_path;
    SqliteStore::open(path)
        .await
        .with_context(|| format!("Failed to open database at {}", path.display()))
}
