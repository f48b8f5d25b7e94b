//! Scheduler-level counters.
//!
//! Per call: `total_requests` always increments; then exactly one of a
//! cooldown hit (blocked at the gate), `successful_calls` or `failed_calls`.

use ads_core::ReasoningLayer;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LayerMetrics {
    pub selections: u64,
    pub cooldown_hits: u64,
    pub total_urgency: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchedulerMetrics {
    pub layers: BTreeMap<ReasoningLayer, LayerMetrics>,
    pub total_requests: u64,
    pub successful_calls: u64,
    pub failed_calls: u64,
    pub last_reset: DateTime<Utc>,
}

impl SchedulerMetrics {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            layers: ReasoningLayer::ALL
                .into_iter()
                .map(|layer| (layer, LayerMetrics::default()))
                .collect(),
            total_requests: 0,
            successful_calls: 0,
            failed_calls: 0,
            last_reset: now,
        }
    }

    pub fn layer(&self, layer: ReasoningLayer) -> LayerMetrics {
        self.layers.get(&layer).copied().unwrap_or_default()
    }

    pub(crate) fn record_selection(&mut self, layer: ReasoningLayer, urgency: u8) {
        let entry = self.layers.entry(layer).or_default();
        entry.selections += 1;
        entry.total_urgency += u64::from(urgency);
    }

    pub(crate) fn record_cooldown_hit(&mut self, layer: ReasoningLayer) {
        self.layers.entry(layer).or_default().cooldown_hits += 1;
    }

    /// Calls that reached the gate but were blocked.
    pub fn blocked_calls(&self) -> u64 {
        self.layers.values().map(|l| l.cooldown_hits).sum()
    }

    pub fn with_averages(&self) -> MetricsWithAverages {
        let layer_averages = self
            .layers
            .iter()
            .map(|(layer, m)| LayerSummary {
                layer: *layer,
                average_urgency: ratio(m.total_urgency, m.selections),
                cooldown_hit_rate: ratio(m.cooldown_hits, m.selections),
            })
            .collect();
        let attempted = self.successful_calls + self.failed_calls;
        MetricsWithAverages {
            metrics: self.clone(),
            layer_averages,
            success_rate: ratio(self.successful_calls, attempted),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerSummary {
    pub layer: ReasoningLayer,
    pub average_urgency: f64,
    /// Fraction of selections of this layer that were blocked.
    pub cooldown_hit_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsWithAverages {
    #[serde(flatten)]
    pub metrics: SchedulerMetrics,
    pub layer_averages: Vec<LayerSummary>,
    /// Successful fraction of routed calls.
    pub success_rate: f64,
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
