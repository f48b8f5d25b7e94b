use anyhow::Result;

use ads_config::{ModelRegistry, SchedulerConfig};
use ads_core::{OutputFormat, Tier};
use ads_router::{CustomEndpoint, ProviderResolver, ResolvedRoute};

/// Handle `ads route`: resolve as if every registry queue were reachable.
pub(crate) fn handle_route(
    config: &SchedulerConfig,
    model: Option<String>,
    tier: Option<Tier>,
    url: Option<String>,
    repeat: usize,
    format: OutputFormat,
) -> Result<()> {
    let routes = dry_run(config, model.as_deref(), tier, url, repeat.max(1));

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&routes)?),
        OutputFormat::Text => {
            for route in &routes {
                println!("{} ({:?})", route.queue_name, route.source);
                if !route.fallback_chain.is_empty() {
                    println!("  fallback: {}", route.fallback_chain.join(", "));
                }
            }
        }
    }
    Ok(())
}

fn dry_run(
    config: &SchedulerConfig,
    model: Option<&str>,
    tier: Option<Tier>,
    url: Option<String>,
    repeat: usize,
) -> Vec<ResolvedRoute> {
    let registry = config.registry();
    let reachable = registry_queues(&registry);
    let resolver = ProviderResolver::new(registry, config.router.default_model.clone());
    let endpoint = url.map(|base_url| CustomEndpoint {
        base_url,
        api_key: None,
        model: None,
    });

    (0..repeat)
        .map(|_| {
            resolver.detect_provider(model, tier, endpoint.as_ref(), |queue| {
                reachable.iter().any(|q| q == queue)
            })
        })
        .collect()
}

fn registry_queues(registry: &ModelRegistry) -> Vec<String> {
    registry.models().iter().map(|m| m.queue_name()).collect()
}
