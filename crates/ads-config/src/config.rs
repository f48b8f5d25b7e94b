//! Scheduler configuration file (`~/.config/agent-decision-scheduler/config.toml`).
//!
//! Every section is optional; a missing file yields the built-in defaults.

use anyhow::{Context, Result};
use ads_core::ReasoningLayer;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::layers::{LayerConfigPatch, LayerConfigs};
use crate::rate_limits::{RateLimitConfig, RateLimitTable};
use crate::registry::{ModelConfig, ModelRegistry};

const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";
const DEFAULT_SESSION_TIMEOUT_MS: u64 = 5 * 60 * 1000;
const DEFAULT_SNAPSHOT_INTERVAL_SECS: u64 = 60;
const DEFAULT_MAX_METRIC_ENTRIES: usize = 10_000;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default)]
    pub layers: LayerOverrides,
    #[serde(default)]
    pub rate_limits: HashMap<String, RateLimitConfig>,
    /// Keyed by [`crate::hash_api_key`] output, never by the raw key.
    #[serde(default)]
    pub rate_limit_overrides: HashMap<String, RateLimitConfig>,
    /// Extra or replacement registry entries.
    #[serde(default)]
    pub models: Vec<ModelConfig>,
    #[serde(default)]
    pub router: RouterSettings,
    #[serde(default)]
    pub sessions: SessionSettings,
    #[serde(default)]
    pub metrics: MetricsSettings,
}

/// `[layers.*]` sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LayerOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autonomic: Option<LayerConfigPatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub talker: Option<LayerConfigPatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executor: Option<LayerConfigPatch>,
}

impl LayerOverrides {
    pub fn get(&self, layer: ReasoningLayer) -> Option<&LayerConfigPatch> {
        match layer {
            ReasoningLayer::Autonomic => self.autonomic.as_ref(),
            ReasoningLayer::Talker => self.talker.as_ref(),
            ReasoningLayer::Executor => self.executor.as_ref(),
        }
    }
}

/// Admission policy applied before dispatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CooldownPolicyKind {
    /// Admit everything; the provider pool's concurrency limits apply.
    #[default]
    None,
    /// `(60000 / rpm) * active_sessions` between requests per session.
    FairShare,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterSettings {
    /// Last-resort model when nothing reachable can be found.
    #[serde(default = "default_model")]
    pub default_model: String,
    #[serde(default)]
    pub cooldown_policy: CooldownPolicyKind,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            default_model: default_model(),
            cooldown_policy: CooldownPolicyKind::default(),
        }
    }
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    /// A session without a heartbeat for this long no longer counts as active.
    #[serde(default = "default_session_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_SESSION_TIMEOUT_MS,
        }
    }
}

fn default_session_timeout_ms() -> u64 {
    DEFAULT_SESSION_TIMEOUT_MS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSettings {
    #[serde(default = "default_snapshot_interval_secs")]
    pub snapshot_interval_secs: u64,
    /// Ring size of the in-memory request log.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            snapshot_interval_secs: DEFAULT_SNAPSHOT_INTERVAL_SECS,
            max_entries: DEFAULT_MAX_METRIC_ENTRIES,
        }
    }
}

fn default_snapshot_interval_secs() -> u64 {
    DEFAULT_SNAPSHOT_INTERVAL_SECS
}

fn default_max_entries() -> usize {
    DEFAULT_MAX_METRIC_ENTRIES
}

impl SchedulerConfig {
    /// Load from the default location.
    ///
    /// Returns `Default` if the file does not exist or if the config
    /// directory cannot be determined (e.g., no HOME in containers).
    pub fn load() -> Result<Self> {
        let path = match Self::config_path() {
            Ok(p) => p,
            Err(_) => return Ok(Self::default()),
        };
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load from an explicit path. The file must exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scheduler config: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse scheduler config: {}", path.display()))?;
        tracing::debug!(path = %path.display(), models = config.models.len(), "Loaded scheduler config");
        Ok(config)
    }

    /// Path to the config file: `~/.config/agent-decision-scheduler/config.toml`.
    pub fn config_path() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("", "", "agent-decision-scheduler")
            .context("Failed to determine config directory")?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Built-in layer defaults with `[layers.*]` applied.
    pub fn layer_configs(&self) -> LayerConfigs {
        let mut configs = LayerConfigs::default();
        for layer in ReasoningLayer::ALL {
            if let Some(patch) = self.layers.get(layer) {
                configs.patch(layer, patch);
            }
        }
        configs
    }

    /// Built-in registry with `[[models]]` applied.
    pub fn registry(&self) -> ModelRegistry {
        ModelRegistry::builtin().with_overrides(self.models.iter().cloned())
    }

    pub fn rate_limit_table(&self) -> RateLimitTable {
        RateLimitTable::builtin().merged(&self.rate_limits, &self.rate_limit_overrides)
    }

    /// Serialize the effective configuration (for `ads config show`).
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize scheduler config")
    }
}
