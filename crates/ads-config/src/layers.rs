//! Per-layer scheduling settings.

use ads_core::{ReasoningLayer, Tier};
use serde::{Deserialize, Serialize};

/// Cooldown, priority and routing tier for one reasoning layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerConfig {
    /// Minimum gap between two invocations of this layer for the same agent.
    ///
    /// For `talker` this is the out-of-conversation cooldown; agents in an
    /// active conversation use a tenth of it.
    pub cooldown_ms: u64,
    pub priority: u8,
    pub enabled: bool,
    /// Tier requested when no explicit default model is set.
    pub tier: Tier,
}

impl LayerConfig {
    pub fn default_for(layer: ReasoningLayer) -> Self {
        match layer {
            ReasoningLayer::Autonomic => Self {
                cooldown_ms: 1_000,
                priority: 10,
                enabled: true,
                tier: Tier::Simple,
            },
            ReasoningLayer::Talker => Self {
                cooldown_ms: 20_000,
                priority: 5,
                enabled: true,
                tier: Tier::Default,
            },
            ReasoningLayer::Executor => Self {
                cooldown_ms: 5_000,
                priority: 3,
                enabled: true,
                tier: Tier::High,
            },
        }
    }

    pub fn apply(&mut self, patch: &LayerConfigPatch) {
        if let Some(cooldown_ms) = patch.cooldown_ms {
            self.cooldown_ms = cooldown_ms;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(enabled) = patch.enabled {
            self.enabled = enabled;
        }
        if let Some(tier) = patch.tier {
            self.tier = tier;
        }
    }
}

/// Partial update for a [`LayerConfig`]; `None` fields are left untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerConfigPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooldown_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<Tier>,
}

/// One [`LayerConfig`] per layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerConfigs([LayerConfig; 3]);

impl LayerConfigs {
    pub fn get(&self, layer: ReasoningLayer) -> LayerConfig {
        self.0[layer.index()]
    }

    pub fn patch(&mut self, layer: ReasoningLayer, patch: &LayerConfigPatch) {
        self.0[layer.index()].apply(patch);
    }
}

impl Default for LayerConfigs {
    fn default() -> Self {
        Self(ReasoningLayer::ALL.map(LayerConfig::default_for))
    }
}
