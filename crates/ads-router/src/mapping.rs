//! Provider mapping table, derived once from the registry.

use ads_config::ModelRegistry;
use serde::Serialize;
use std::collections::HashMap;

/// Routing facts for one registry model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderMapping {
    pub provider: String,
    pub queue_name: String,
    /// Same-tier queues on other server providers, highest throughput first.
    pub fallback_chain: Vec<String>,
}

/// Build the mapping for every registry model, keyed by model id.
///
/// A chain never contains the model itself, a queue on the model's own
/// provider, or a local-only model.
pub fn build_provider_mappings(registry: &ModelRegistry) -> HashMap<String, ProviderMapping> {
    registry
        .models()
        .iter()
        .map(|model| {
            let fallback_chain = registry
                .in_tier(model.tier)
                .into_iter()
                .filter(|other| other.id != model.id && other.provider != model.provider)
                .map(|other| other.queue_name())
                .collect();
            (
                model.id.clone(),
                ProviderMapping {
                    provider: model.provider.clone(),
                    queue_name: model.queue_name(),
                    fallback_chain,
                },
            )
        })
        .collect()
}
