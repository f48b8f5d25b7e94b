//! Request routing: resolves a model, tier, or custom endpoint to a concrete
//! provider queue, applies fair-share admission, dispatches to the provider
//! pool, and records metrics and cost.

pub mod cost;
pub mod detect;
pub mod mapping;
pub mod metrics;
pub mod provider;
pub mod resolver;
pub mod rotation;
pub mod router;

pub use cost::{CostEntry, CostSummary, CostTracker, InMemoryCostTracker};
pub use detect::{CustomEndpoint, classify_endpoint, infer_provider, legacy_alias};
pub use mapping::{ProviderMapping, build_provider_mappings};
pub use metrics::{
    InMemoryMetricsCollector, MetricTotals, MetricsCollector, RequestMetric, RouterStats,
    StatsProvider, StatsSnapshot,
};
pub use provider::{InferenceRequest, ProviderPool, ProviderResponse, QueueStat, QueueStats};
pub use resolver::{ProviderResolver, ResolvedRoute, RouteSource};
pub use rotation::RoundRobin;
pub use router::{RequestRouter, RoutePayload, RoutedResponse, RouterCollaborators};
