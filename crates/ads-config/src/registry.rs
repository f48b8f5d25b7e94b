//! Static table of known backend models.
//!
//! The registry is built once at startup (built-in table plus `[[models]]`
//! entries from the config file) and passed by value to the router. It is
//! never mutated afterwards.

use ads_core::Tier;
use serde::{Deserialize, Serialize};

/// One backend model on one provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub id: String,
    pub provider: String,
    pub tier: Tier,
    pub requests_per_minute: u32,
    /// Local-only backends (e.g. ollama) are never routed to by tier and
    /// never appear in fallback chains.
    #[serde(default)]
    pub excluded_from_server: bool,
    /// USD per million input tokens. 0 when unknown.
    #[serde(default)]
    pub input_cost_per_mtok: f64,
    /// USD per million output tokens. 0 when unknown.
    #[serde(default)]
    pub output_cost_per_mtok: f64,
}

impl ModelConfig {
    pub fn new(
        id: impl Into<String>,
        provider: impl Into<String>,
        tier: Tier,
        requests_per_minute: u32,
    ) -> Self {
        Self {
            id: id.into(),
            provider: provider.into(),
            tier,
            requests_per_minute,
            excluded_from_server: false,
            input_cost_per_mtok: 0.0,
            output_cost_per_mtok: 0.0,
        }
    }

    pub fn local_only(mut self) -> Self {
        self.excluded_from_server = true;
        self
    }

    pub fn with_pricing(mut self, input_per_mtok: f64, output_per_mtok: f64) -> Self {
        self.input_cost_per_mtok = input_per_mtok;
        self.output_cost_per_mtok = output_per_mtok;
        self
    }

    /// Routable queue identifier: `{provider}:{model}`.
    pub fn queue_name(&self) -> String {
        queue_name(&self.provider, &self.id)
    }

    /// Cost in USD for the given token counts.
    pub fn cost_for(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        (input_tokens as f64 * self.input_cost_per_mtok
            + output_tokens as f64 * self.output_cost_per_mtok)
            / 1_000_000.0
    }
}

/// Queue identifier for a model that may not be in the registry.
pub fn queue_name(provider: &str, model: &str) -> String {
    format!("{provider}:{model}")
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelRegistry {
    models: Vec<ModelConfig>,
}

impl ModelRegistry {
    pub fn new(models: Vec<ModelConfig>) -> Self {
        Self { models }
    }

    /// Built-in model table.
    pub fn builtin() -> Self {
        Self::new(vec![
            ModelConfig::new("llama-3.1-8b-instant", "groq", Tier::Simple, 60)
                .with_pricing(0.05, 0.08),
            ModelConfig::new("llama3.1-8b", "cerebras", Tier::Simple, 30).with_pricing(0.1, 0.1),
            ModelConfig::new("meta-llama/llama-3.2-3b-instruct", "openrouter", Tier::Simple, 20)
                .with_pricing(0.015, 0.025),
            ModelConfig::new("qwen3:4b", "ollama", Tier::Simple, 120).local_only(),
            ModelConfig::new("llama-3.3-70b-versatile", "groq", Tier::Default, 30)
                .with_pricing(0.59, 0.79),
            ModelConfig::new("llama-3.3-70b", "cerebras", Tier::Default, 30)
                .with_pricing(0.85, 1.2),
            ModelConfig::new(
                "meta-llama/llama-3.3-70b-instruct",
                "openrouter",
                Tier::Default,
                20,
            )
            .with_pricing(0.13, 0.4),
            ModelConfig::new("qwen3:14b", "ollama", Tier::Default, 60).local_only(),
            ModelConfig::new("qwen/qwen3-32b", "groq", Tier::High, 60).with_pricing(0.29, 0.59),
            ModelConfig::new("qwen-3-32b", "cerebras", Tier::High, 30).with_pricing(0.4, 0.8),
            ModelConfig::new("qwen/qwen3-235b-a22b", "openrouter", Tier::High, 20)
                .with_pricing(0.13, 0.6),
        ])
    }

    /// Replace entries with a matching id, append the rest.
    pub fn with_overrides(mut self, overrides: impl IntoIterator<Item = ModelConfig>) -> Self {
        for model in overrides {
            match self.models.iter_mut().find(|m| m.id == model.id) {
                Some(existing) => *existing = model,
                None => self.models.push(model),
            }
        }
        self
    }

    pub fn models(&self) -> &[ModelConfig] {
        &self.models
    }

    pub fn get(&self, id: &str) -> Option<&ModelConfig> {
        self.models.iter().find(|m| m.id == id)
    }

    /// Server-routable models in a tier, highest throughput first.
    ///
    /// Ties keep table order.
    pub fn in_tier(&self, tier: Tier) -> Vec<&ModelConfig> {
        let mut models: Vec<&ModelConfig> = self
            .models
            .iter()
            .filter(|m| m.tier == tier && !m.excluded_from_server)
            .collect();
        models.sort_by(|a, b| b.requests_per_minute.cmp(&a.requests_per_minute));
        models
    }

    /// All server-routable models, highest throughput first.
    pub fn by_throughput(&self) -> Vec<&ModelConfig> {
        let mut models: Vec<&ModelConfig> = self
            .models
            .iter()
            .filter(|m| !m.excluded_from_server)
            .collect();
        models.sort_by(|a, b| b.requests_per_minute.cmp(&a.requests_per_minute));
        models
    }

    /// Requests-per-minute rating of the fastest model a provider serves.
    pub fn provider_rpm(&self, provider: &str) -> Option<u32> {
        self.models
            .iter()
            .filter(|m| m.provider == provider)
            .map(|m| m.requests_per_minute)
            .max()
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
