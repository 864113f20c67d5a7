//! `freeagent tools`: Print the tool catalog the model sees.

use freeagent_config::AppConfig;
use freeagent_memory::InMemoryStore;
use serde_json::json;
use std::sync::Arc;

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    // The catalog does not depend on stored data
    let registry = freeagent_tools::default_registry(
        Arc::new(InMemoryStore::new()),
        &config.session.end_session_tool,
    )?;

    let catalog: Vec<_> = registry
        .catalog()
        .into_iter()
        .map(|t| {
            json!({
                "name": t.name,
                "description": t.description,
                "input_schema": t.parameters.to_json_schema(),
            })
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&catalog)?);
    Ok(())
}
