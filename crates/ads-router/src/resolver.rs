//! Resolution of (model | tier | custom endpoint) to a routable queue.
//!
//! Resolution never fails. When nothing reachable matches, the result points
//! at the configured default model and the failure surfaces at dispatch.

use ads_config::{ModelConfig, ModelRegistry, queue_name};
use ads_core::Tier;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use tracing::{debug, warn};

use crate::detect::{CustomEndpoint, classify_endpoint, infer_provider, legacy_alias};
use crate::mapping::{ProviderMapping, build_provider_mappings};
use crate::rotation::RoundRobin;

const FALLBACK_PROVIDER: &str = "openrouter";
const CUSTOM_DEFAULT_MODEL: &str = "default";

/// How a route was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RouteSource {
    CustomEndpoint,
    Registry,
    LegacyAlias,
    Inferred,
    Tier,
    /// Requested tier had nothing reachable; best model of another tier.
    CrossTier,
    /// First reachable queue in registry order, local-only included.
    RegistryScan,
    /// Nothing reachable at all.
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedRoute {
    pub provider: String,
    pub queue_name: String,
    pub model: String,
    pub source: RouteSource,
    pub fallback_chain: Vec<String>,
}

#[derive(Debug)]
pub struct ProviderResolver {
    registry: ModelRegistry,
    mappings: HashMap<String, ProviderMapping>,
    rotation: RoundRobin,
    default_model: RwLock<String>,
}

impl ProviderResolver {
    pub fn new(registry: ModelRegistry, default_model: impl Into<String>) -> Self {
        let mappings = build_provider_mappings(&registry);
        Self {
            registry,
            mappings,
            rotation: RoundRobin::new(),
            default_model: RwLock::new(default_model.into()),
        }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn mapping(&self, model_id: &str) -> Option<&ProviderMapping> {
        self.mappings.get(model_id)
    }

    pub fn default_model(&self) -> String {
        self.default_model
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_default_model(&self, model_id: impl Into<String>) {
        *self
            .default_model
            .write()
            .unwrap_or_else(PoisonError::into_inner) = model_id.into();
    }

    /// Resolve a route. `is_reachable` reports whether a queue can currently
    /// accept work. Without a model or endpoint the request is tier-routed
    /// (`Tier::Default` when no tier is given).
    pub fn detect_provider(
        &self,
        model: Option<&str>,
        tier: Option<Tier>,
        custom: Option<&CustomEndpoint>,
        is_reachable: impl Fn(&str) -> bool,
    ) -> ResolvedRoute {
        if let Some(endpoint) = custom {
            let provider = classify_endpoint(&endpoint.base_url);
            let model = endpoint
                .model
                .as_deref()
                .or(model)
                .unwrap_or(CUSTOM_DEFAULT_MODEL)
                .to_string();
            return ResolvedRoute {
                queue_name: queue_name(&provider, &model),
                provider,
                model,
                source: RouteSource::CustomEndpoint,
                fallback_chain: Vec::new(),
            };
        }

        match model {
            Some(model) => self.resolve_model(model, &is_reachable),
            None => self.resolve_tier(tier.unwrap_or_default(), &is_reachable),
        }
    }

    fn resolve_model(&self, model: &str, is_reachable: &impl Fn(&str) -> bool) -> ResolvedRoute {
        if let Some(config) = self.registry.get(model) {
            if is_reachable(&config.queue_name()) {
                return self.route_to(config, RouteSource::Registry);
            }
            debug!(model = %model, "Registry queue unreachable, trying aliases");
        }

        if let Some((provider, target)) = legacy_alias(model) {
            return match self.registry.get(target) {
                Some(config) => self.route_to(config, RouteSource::LegacyAlias),
                None => ResolvedRoute {
                    provider: provider.to_string(),
                    queue_name: queue_name(provider, target),
                    model: target.to_string(),
                    source: RouteSource::LegacyAlias,
                    fallback_chain: Vec::new(),
                },
            };
        }

        let provider = self
            .registry
            .get(model)
            .map(|m| m.provider.as_str())
            .or_else(|| infer_provider(model))
            .unwrap_or(FALLBACK_PROVIDER);
        warn!(model = %model, provider = %provider, "Unresolved model, inferred provider from id");
        ResolvedRoute {
            provider: provider.to_string(),
            queue_name: queue_name(provider, model),
            model: model.to_string(),
            source: RouteSource::Inferred,
            fallback_chain: self
                .mappings
                .get(model)
                .map(|m| m.fallback_chain.clone())
                .unwrap_or_default(),
        }
    }

    fn resolve_tier(&self, tier: Tier, is_reachable: &impl Fn(&str) -> bool) -> ResolvedRoute {
        let reachable: Vec<&ModelConfig> = self
            .registry
            .in_tier(tier)
            .into_iter()
            .filter(|m| is_reachable(&m.queue_name()))
            .collect();

        if !reachable.is_empty() {
            let index = self.rotation.next(reachable.len());
            debug!(
                tier = %tier,
                model = %reachable[index].id,
                index,
                candidates = reachable.len(),
                "Round-robin selected model"
            );
            return self.route_to(reachable[index], RouteSource::Tier);
        }

        if let Some(config) = self
            .registry
            .by_throughput()
            .into_iter()
            .find(|m| is_reachable(&m.queue_name()))
        {
            warn!(tier = %tier, model = %config.id, "No reachable model in tier, using another tier");
            return self.route_to(config, RouteSource::CrossTier);
        }

        if let Some(config) = self
            .registry
            .models()
            .iter()
            .find(|m| is_reachable(&m.queue_name()))
        {
            warn!(tier = %tier, model = %config.id, "Only a local-only queue is reachable");
            return self.route_to(config, RouteSource::RegistryScan);
        }

        let default_model = self.default_model();
        warn!(tier = %tier, model = %default_model, "No provider available, routing to default model");
        match self.registry.get(&default_model) {
            Some(config) => self.route_to(config, RouteSource::Default),
            None => {
                let provider = infer_provider(&default_model).unwrap_or(FALLBACK_PROVIDER);
                ResolvedRoute {
                    provider: provider.to_string(),
                    queue_name: queue_name(provider, &default_model),
                    model: default_model,
                    source: RouteSource::Default,
                    fallback_chain: Vec::new(),
                }
            }
        }
    }

    fn route_to(&self, config: &ModelConfig, source: RouteSource) -> ResolvedRoute {
        let fallback_chain = self
            .mappings
            .get(&config.id)
            .map(|m| m.fallback_chain.clone())
            .unwrap_or_default();
        ResolvedRoute {
            provider: config.provider.clone(),
            queue_name: config.queue_name(),
            model: config.id.clone(),
            source,
            fallback_chain,
        }
    }
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;
