//! `freeagent run`: Live one session and persist its record.

use anyhow::{Context, bail};
use chrono::Utc;
use freeagent_agent::{SessionContext, SessionLoop, run_and_persist};
use freeagent_config::AppConfig;
use freeagent_core::session::TerminationReason;
use freeagent_providers::AnthropicProvider;
use std::sync::Arc;
use tracing::info;

pub async fn run(mut config: AppConfig, max_turns: Option<u32>) -> anyhow::Result<()> {
    if let Some(turns) = max_turns {
        config.session.turn_budget = turns;
        config.validate()?;
    }

    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set the environment variable:");
        eprintln!("    export ANTHROPIC_API_KEY='sk-ant-...'");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        bail!("No API key found. See above for setup instructions.");
    }

    let provider = Arc::new(AnthropicProvider::from_config(&config)?);
    let store = Arc::new(super::open_store(&config).await?);
    let registry = Arc::new(
        freeagent_tools::default_registry(store.clone(), &config.session.end_session_tool)
            .context("Failed to build the tool registry")?,
    );

    let context = SessionContext::load(store.as_ref(), store.as_ref(), &config.storage)
        .await
        .context("Failed to load session context")?;

    let session_loop = SessionLoop::from_config(provider, registry, &config);
    let report = run_and_persist(&session_loop, &context, store.as_ref(), Utc::now().date_naive()).await;
    let record = &report.outcome.record;

    info!(session_id = %record.id, persisted = report.persisted, "Session complete");

    println!();
    println!("  Session:  {}", record.id);
    println!(
        "  Ended:    {}",
        record.termination.map_or("unknown", |r| r.as_str())
    );
    println!("  Turns:    {}/{}", record.turns_used, session_loop.turn_budget());
    println!(
        "  Actions:  {} ({} failed)",
        record.actions.len(),
        record.failed_actions()
    );
    println!("  Summary:  {}", record.summary);
    println!();

    if !report.persisted {
        bail!("Session record could not be saved");
    }
    if record.termination == Some(TerminationReason::ModelError) {
        bail!("Session ended early because the model could not be queried");
    }

    Ok(())
}
