use anyhow::Result;

use ads_config::{ModelConfig, SchedulerConfig};
use ads_core::{OutputFormat, Tier};
use ads_router::build_provider_mappings;

/// Handle `ads models`.
pub(crate) fn handle_models(
    config: &SchedulerConfig,
    tier: Option<Tier>,
    format: OutputFormat,
) -> Result<()> {
    let registry = config.registry();
    let mappings = build_provider_mappings(&registry);
    let models: Vec<&ModelConfig> = match tier {
        Some(tier) => registry.in_tier(tier),
        None => registry.models().iter().collect(),
    };

    match format {
        OutputFormat::Json => {
            let rows: Vec<serde_json::Value> = models
                .iter()
                .map(|m| {
                    serde_json::json!({
                        "id": m.id,
                        "provider": m.provider,
                        "tier": m.tier,
                        "requests_per_minute": m.requests_per_minute,
                        "queue_name": m.queue_name(),
                        "excluded_from_server": m.excluded_from_server,
                        "fallback_chain": mappings
                            .get(&m.id)
                            .map(|p| p.fallback_chain.clone())
                            .unwrap_or_default(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        OutputFormat::Text => {
            if models.is_empty() {
                eprintln!("No models configured.");
                return Ok(());
            }
            for m in &models {
                let local = if m.excluded_from_server { " [local]" } else { "" };
                println!(
                    "{:<8} {:<40} {:>5} rpm{}",
                    m.tier.as_str(),
                    m.queue_name(),
                    m.requests_per_minute,
                    local
                );
                if let Some(mapping) = mappings.get(&m.id) {
                    if !mapping.fallback_chain.is_empty() {
                        println!("         fallback: {}", mapping.fallback_chain.join(", "));
                    }
                }
            }
            if tier.is_some() {
                println!();
                println!("Note: models within a tier rotate round-robin in the order shown.");
            }
        }
    }
    Ok(())
}
