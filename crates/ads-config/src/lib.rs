//! Scheduler configuration: model registry, per-layer settings, provider rate
//! limits, and the config file that overrides them.

pub mod config;
pub mod layers;
pub mod rate_limits;
pub mod registry;

pub use config::{
    CooldownPolicyKind, LayerOverrides, MetricsSettings, RouterSettings, SchedulerConfig,
    SessionSettings,
};
pub use layers::{LayerConfig, LayerConfigPatch, LayerConfigs};
pub use rate_limits::{RateLimitConfig, RateLimitTable, hash_api_key};
pub use registry::{ModelConfig, ModelRegistry, queue_name};
