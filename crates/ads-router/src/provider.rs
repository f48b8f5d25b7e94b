//! Interface to the external provider pool.
//!
//! The pool owns the HTTP mechanics, retries, and per-queue concurrency
//! limits. The router only names a queue and hands over a normalized request.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::detect::CustomEndpoint;

/// Normalized inference request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InferenceRequest {
    pub model: String,
    pub prompt: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    /// Present when the caller supplied its own endpoint.
    pub endpoint: Option<CustomEndpoint>,
}

/// Normalized inference response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderResponse {
    pub text: String,
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStat {
    pub pending: usize,
    pub in_flight: usize,
    pub completed: u64,
    pub failed: u64,
}

/// Per-queue statistics keyed by queue name.
pub type QueueStats = BTreeMap<String, QueueStat>;

#[async_trait]
pub trait ProviderPool: Send + Sync {
    /// Run one request on the named queue. May retry or fall back internally.
    async fn execute(
        &self,
        queue_name: &str,
        request: InferenceRequest,
        agent_id: &str,
        session_id: &str,
    ) -> Result<ProviderResponse>;

    /// Whether the queue is currently reachable.
    fn has_provider(&self, queue_name: &str) -> bool;

    fn queue_stats(&self) -> QueueStats;
}
