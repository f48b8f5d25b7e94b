//! Composition root for per-tick agent decisions.
//!
//! `request_decision` runs: layer selection, cooldown gate (atomic check and
//! record), prompt build, routing. A `None` result means the chosen layer was
//! cooling down or disabled, or the router's fair-share admission turned the
//! request away before dispatch; none of these is an error.

use ads_config::{LayerConfig, LayerConfigPatch, LayerConfigs, SchedulerConfig};
use ads_core::{AgentSnapshot, AppError, ReasoningLayer};
use ads_router::{ProviderPool, QueueStats, RequestRouter, RoutePayload, RoutedResponse};
use ads_session::SessionStats;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tracing::{debug, info, warn};

use crate::cooldown_gate::{CooldownGate, GateDecision};
use crate::layer_selector::select_layer;
use crate::metrics::{MetricsWithAverages, SchedulerMetrics};
use crate::prompt::PromptBuilders;

#[derive(Debug, Clone, Serialize)]
pub struct Decision {
    pub layer: ReasoningLayer,
    pub reason: String,
    pub urgency: u8,
    pub response: RoutedResponse,
}

#[derive(Debug)]
pub struct Scheduler {
    session_id: String,
    router: Arc<RequestRouter>,
    gate: CooldownGate,
    prompts: PromptBuilders,
    metrics: Mutex<SchedulerMetrics>,
    /// When set, every layer requests this model instead of its tier.
    preferred_model: RwLock<Option<String>>,
}

impl Scheduler {
    pub fn new(
        session_id: impl Into<String>,
        router: Arc<RequestRouter>,
        layers: LayerConfigs,
        prompts: PromptBuilders,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            router,
            gate: CooldownGate::new(layers),
            prompts,
            metrics: Mutex::new(SchedulerMetrics::new(Utc::now())),
            preferred_model: RwLock::new(None),
        }
    }

    /// Scheduler with `[layers.*]` applied over a router built by
    /// [`RequestRouter::from_config`].
    pub fn from_config(
        session_id: impl Into<String>,
        config: &SchedulerConfig,
        pool: Arc<dyn ProviderPool>,
        prompts: PromptBuilders,
    ) -> Self {
        let router = Arc::new(RequestRouter::from_config(config, pool));
        Self::new(session_id, router, config.layer_configs(), prompts)
    }

    pub fn router(&self) -> &Arc<RequestRouter> {
        &self.router
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub async fn request_decision(
        &self,
        agent: &AgentSnapshot,
    ) -> Result<Option<Decision>, AppError> {
        self.request_decision_at(agent, Utc::now()).await
    }

    /// [`Self::request_decision`] with an explicit clock for the cooldown gate.
    pub async fn request_decision_at(
        &self,
        agent: &AgentSnapshot,
        now: DateTime<Utc>,
    ) -> Result<Option<Decision>, AppError> {
        self.metrics().total_requests += 1;

        let selection = match select_layer(agent) {
            Ok(selection) => selection,
            Err(e) => {
                self.metrics().failed_calls += 1;
                warn!(agent = %agent.agent_id, error = %e, "Rejected agent snapshot");
                return Err(e);
            }
        };
        self.metrics()
            .record_selection(selection.layer, selection.urgency);

        let previous = match self
            .gate
            .try_acquire(&agent.agent_id, selection.layer, agent.conversation.as_ref(), now)
        {
            GateDecision::Acquired { previous } => previous,
            GateDecision::CoolingDown { wait_ms } => {
                self.metrics().record_cooldown_hit(selection.layer);
                debug!(
                    agent = %agent.agent_id,
                    layer = %selection.layer,
                    wait_ms,
                    "Layer cooling down"
                );
                return Ok(None);
            }
            GateDecision::Disabled => {
                self.metrics().record_cooldown_hit(selection.layer);
                debug!(agent = %agent.agent_id, layer = %selection.layer, "Layer disabled");
                return Ok(None);
            }
        };

        let prompt = self.prompts.for_layer(selection.layer).build_prompt(agent);
        let model = self.default_model();
        let tier = match model {
            Some(_) => None,
            None => Some(self.gate.layer_config(selection.layer).tier),
        };
        let payload = RoutePayload {
            session_id: self.session_id.clone(),
            agent_id: agent.agent_id.clone(),
            prompt,
            model,
            tier,
            ..Default::default()
        };

        match self.router.route_request(payload).await {
            Ok(response) => {
                self.metrics().successful_calls += 1;
                debug!(
                    agent = %agent.agent_id,
                    layer = %selection.layer,
                    urgency = selection.urgency,
                    model = %response.model,
                    "Decision routed"
                );
                Ok(Some(Decision {
                    layer: selection.layer,
                    reason: selection.reason,
                    urgency: selection.urgency,
                    response,
                }))
            }
            Err(AppError::RateLimitCooldown {
                wait_ms,
                active_games,
                ..
            }) => {
                // Nothing was dispatched, so the layer slot goes back.
                self.gate
                    .release(&agent.agent_id, selection.layer, now, previous);
                self.metrics().record_cooldown_hit(selection.layer);
                debug!(
                    agent = %agent.agent_id,
                    layer = %selection.layer,
                    wait_ms,
                    active_games,
                    "Request held back by fair-share admission"
                );
                Ok(None)
            }
            Err(e) => {
                self.metrics().failed_calls += 1;
                warn!(
                    agent = %agent.agent_id,
                    layer = %selection.layer,
                    error = %e,
                    "Decision request failed"
                );
                Err(e)
            }
        }
    }

    pub fn set_layer_config(&self, layer: ReasoningLayer, patch: &LayerConfigPatch) {
        self.gate.set_layer_config(layer, patch);
        info!(layer = %layer, config = ?self.gate.layer_config(layer), "Layer config updated");
    }

    pub fn layer_config(&self, layer: ReasoningLayer) -> LayerConfig {
        self.gate.layer_config(layer)
    }

    /// Pin every layer to one model. `None` returns to tier routing.
    pub fn set_default_model(&self, model_id: Option<String>) {
        info!(model = ?model_id, "Default model changed");
        *self
            .preferred_model
            .write()
            .unwrap_or_else(PoisonError::into_inner) = model_id;
    }

    pub fn default_model(&self) -> Option<String> {
        self.preferred_model
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn reset_cooldowns(&self, agent_id: &str, layer: Option<ReasoningLayer>) {
        self.gate.reset_cooldowns(agent_id, layer);
    }

    pub fn cleanup_old_states(&self, max_age_ms: u64) -> usize {
        self.cleanup_old_states_at(max_age_ms, Utc::now())
    }

    pub fn cleanup_old_states_at(&self, max_age_ms: u64, now: DateTime<Utc>) -> usize {
        self.gate.cleanup_old_states(max_age_ms, now)
    }

    pub fn cooldown_gate(&self) -> &CooldownGate {
        &self.gate
    }

    pub fn metrics_snapshot(&self) -> SchedulerMetrics {
        self.metrics().clone()
    }

    pub fn metrics_with_averages(&self) -> MetricsWithAverages {
        self.metrics().with_averages()
    }

    pub fn reset_metrics(&self) {
        *self.metrics() = SchedulerMetrics::new(Utc::now());
    }

    pub fn queue_stats(&self) -> QueueStats {
        self.router.queue_stats()
    }

    pub fn session_stats(&self) -> SessionStats {
        self.router.session_stats()
    }

    fn metrics(&self) -> MutexGuard<'_, SchedulerMetrics> {
        self.metrics.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
