//! `freeagent sessions`: Show recent session summaries.

use freeagent_config::AppConfig;
use freeagent_core::session::SessionSink;

pub async fn run(config: &AppConfig, limit: usize) -> anyhow::Result<()> {
    let store = super::open_store(config).await?;
    let sessions = store.recent(limit).await?;

    if sessions.is_empty() {
        println!("  No sessions yet. Start one with `freeagent run`.");
        return Ok(());
    }

    for s in &sessions {
        println!(
            "  {}  [{}]  {} turns, {} actions ({} failed)",
            s.started_at.format("%Y-%m-%d %H:%M"),
            s.termination.map_or("open", |r| r.as_str()),
            s.turns_used,
            s.actions.len(),
            s.failed_actions()
        );
        println!("      {}", s.summary);
    }

    Ok(())
}
