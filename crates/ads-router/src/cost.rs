//! Cost accounting for successful dispatches.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostEntry {
    pub timestamp: DateTime<Utc>,
    pub provider: String,
    pub model: String,
    pub session_id: String,
    pub agent_id: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost_usd: f64,
    /// Set only for requests made with a caller-supplied key.
    pub api_key_hash: Option<String>,
}

pub trait CostTracker: Send + Sync {
    fn record_cost(&self, entry: CostEntry);
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CostSummary {
    pub total_usd: f64,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub by_provider: BTreeMap<String, f64>,
    pub by_session: BTreeMap<String, f64>,
}

/// Keeps every entry in memory. Intended for tests and short-lived runs.
#[derive(Debug, Default)]
pub struct InMemoryCostTracker {
    entries: Mutex<Vec<CostEntry>>,
}

impl InMemoryCostTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<CostEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn summary(&self) -> CostSummary {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let mut summary = CostSummary::default();
        for entry in entries.iter() {
            summary.total_usd += entry.cost_usd;
            summary.total_input_tokens += entry.input_tokens;
            summary.total_output_tokens += entry.output_tokens;
            *summary
                .by_provider
                .entry(entry.provider.clone())
                .or_default() += entry.cost_usd;
            *summary
                .by_session
                .entry(entry.session_id.clone())
                .or_default() += entry.cost_usd;
        }
        summary
    }
}

impl CostTracker for InMemoryCostTracker {
    fn record_cost(&self, entry: CostEntry) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(provider: &str, session: &str, cost: f64) -> CostEntry {
        CostEntry {
            timestamp: Utc::now(),
            provider: provider.into(),
            model: "m".into(),
            session_id: session.into(),
            agent_id: "a1".into(),
            input_tokens: 100,
            output_tokens: 50,
            cost_usd: cost,
            api_key_hash: None,
        }
    }

    #[test]
    fn test_summary_groups_by_provider_and_session() {
        let tracker = InMemoryCostTracker::new();
        tracker.record_cost(entry("groq", "g1", 0.5));
        tracker.record_cost(entry("groq", "g2", 0.25));
        tracker.record_cost(entry("cerebras", "g1", 1.0));

        let summary = tracker.summary();
        assert!((summary.total_usd - 1.75).abs() < 1e-9);
        assert_eq!(summary.total_input_tokens, 300);
        assert_eq!(summary.total_output_tokens, 150);
        assert!((summary.by_provider["groq"] - 0.75).abs() < 1e-9);
        assert!((summary.by_session["g1"] - 1.5).abs() < 1e-9);
        assert_eq!(tracker.entries().len(), 3);
    }
}
