//! Per-tick decision scheduling: picks the reasoning layer for an agent,
//! gates it on per-agent cooldowns, and routes the resulting prompt.

pub mod cooldown_gate;
pub mod layer_selector;
pub mod metrics;
pub mod prompt;
pub mod scheduler;

pub use cooldown_gate::{AgentLayerState, CooldownGate, GateDecision};
pub use layer_selector::{LayerSelection, select_layer};
pub use metrics::{LayerMetrics, LayerSummary, MetricsWithAverages, SchedulerMetrics};
pub use prompt::{PromptBuilder, PromptBuilders};
pub use scheduler::{Decision, Scheduler};
