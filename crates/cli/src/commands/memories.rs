//! `freeagent memories`: List or search stored memories.

use freeagent_config::AppConfig;
use freeagent_core::memory::MemoryBackend;

pub async fn run(config: &AppConfig, query: Option<&str>, limit: usize) -> anyhow::Result<()> {
    let store = super::open_store(config).await?;

    let entries = match query {
        Some(q) => store.search(q, limit).await?,
        None => store.top(limit).await?,
    };

    if entries.is_empty() {
        println!("  No memories found.");
        return Ok(());
    }

    println!("  {} of {} memories", entries.len(), store.count().await?);
    for m in &entries {
        println!(
            "  #{:<4} [{}] {} {}",
            m.id,
            m.category,
            "★".repeat(m.importance as usize),
            m.content
        );
    }

    Ok(())
}
