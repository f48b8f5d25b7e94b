use anyhow::Result;

use ads_config::{SchedulerConfig, hash_api_key};
use ads_core::OutputFormat;
use ads_session::{CooldownPolicy, FairShareCooldown};

/// Handle `ads cooldown`. Always evaluates the fair-share formula, whatever
/// policy the router is configured with.
pub(crate) fn handle_cooldown(
    config: &SchedulerConfig,
    provider: &str,
    sessions: usize,
    api_key: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let table = config.rate_limit_table();
    let key_hash = api_key.map(hash_api_key);
    let limits = table.lookup(provider, key_hash.as_deref());
    let policy = FairShareCooldown::new(table);
    let cooldown_ms = policy.calculate_cooldown(provider, key_hash.as_deref(), sessions);

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "provider": provider,
                "active_sessions": sessions.max(1),
                "requests_per_minute": limits.requests_per_minute,
                "burst_size": limits.burst_size,
                "api_key_hash": key_hash,
                "cooldown_ms": cooldown_ms,
                "configured_policy": config.router.cooldown_policy,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text => {
            println!(
                "{provider}: {} rpm shared by {} session(s) -> {cooldown_ms} ms between requests",
                limits.requests_per_minute,
                sessions.max(1)
            );
            if let Some(hash) = &key_hash {
                println!("  key override: {hash}");
            }
            println!("  configured policy: {:?}", config.router.cooldown_policy);
        }
    }
    Ok(())
}
