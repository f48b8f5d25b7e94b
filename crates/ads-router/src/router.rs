//! End-to-end request orchestration.
//!
//! Order per request: session heartbeat, provider resolution, fair-share
//! admission, dispatch, metrics (every exit path), cost (success only).
//! Nothing before the dispatch `await` suspends.

use ads_config::{ModelRegistry, RateLimitConfig, SchedulerConfig, hash_api_key};
use ads_core::{AppError, Tier};
use ads_session::{
    CooldownPolicy, CooldownStatus, InMemorySessionManager, SessionManager, SessionStats,
    policy_for,
};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::cost::{CostEntry, CostTracker, InMemoryCostTracker};
use crate::detect::CustomEndpoint;
use crate::mapping::ProviderMapping;
use crate::metrics::{InMemoryMetricsCollector, MetricsCollector, RequestMetric, RouterStats};
use crate::provider::{InferenceRequest, ProviderPool, ProviderResponse, QueueStats};
use crate::resolver::{ProviderResolver, ResolvedRoute, RouteSource};

/// One inference request as submitted by the simulation.
#[derive(Debug, Clone, Default)]
pub struct RoutePayload {
    pub session_id: String,
    pub agent_id: String,
    pub prompt: String,
    pub model: Option<String>,
    pub tier: Option<Tier>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub custom_config: Option<CustomEndpoint>,
}

/// Provider response plus the routing and cooldown facts behind it.
#[derive(Debug, Clone, Serialize)]
pub struct RoutedResponse {
    pub response: ProviderResponse,
    pub provider: String,
    pub model: String,
    pub queue_name: String,
    /// Which resolution step picked the queue.
    pub source: RouteSource,
    /// Same-tier alternatives the pool may fail over to.
    pub fallback_chain: Vec<String>,
    /// The session's next admission window. Informational only.
    pub cooldown: CooldownStatus,
    /// Provider throughput divided across active sessions.
    pub effective_requests_per_minute: f64,
    pub wait_ms: u64,
    pub exec_ms: u64,
}

/// Already-constructed collaborators the router depends on.
pub struct RouterCollaborators {
    pub pool: Arc<dyn ProviderPool>,
    pub sessions: Arc<dyn SessionManager>,
    pub cooldown: Arc<dyn CooldownPolicy>,
    pub costs: Arc<dyn CostTracker>,
    pub metrics: Arc<dyn MetricsCollector>,
}

pub struct RequestRouter {
    resolver: ProviderResolver,
    pool: Arc<dyn ProviderPool>,
    sessions: Arc<dyn SessionManager>,
    cooldown: Arc<dyn CooldownPolicy>,
    costs: Arc<dyn CostTracker>,
    metrics: Arc<dyn MetricsCollector>,
}

impl std::fmt::Debug for RequestRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestRouter")
            .field("resolver", &self.resolver)
            .finish_non_exhaustive()
    }
}

impl RequestRouter {
    pub fn new(
        registry: ModelRegistry,
        default_model: impl Into<String>,
        collaborators: RouterCollaborators,
    ) -> Self {
        let RouterCollaborators {
            pool,
            sessions,
            cooldown,
            costs,
            metrics,
        } = collaborators;
        Self {
            resolver: ProviderResolver::new(registry, default_model),
            pool,
            sessions,
            cooldown,
            costs,
            metrics,
        }
    }

    /// Router over the configured registry with in-memory session, cost and
    /// metrics sinks and the configured admission policy.
    pub fn from_config(config: &SchedulerConfig, pool: Arc<dyn ProviderPool>) -> Self {
        info!(
            cooldown_policy = ?config.router.cooldown_policy,
            default_model = %config.router.default_model,
            session_timeout_ms = config.sessions.timeout_ms,
            "Building request router from config"
        );
        Self::new(
            config.registry(),
            config.router.default_model.clone(),
            RouterCollaborators {
                pool,
                sessions: Arc::new(InMemorySessionManager::new(config.sessions.timeout_ms)),
                cooldown: policy_for(config.router.cooldown_policy, config.rate_limit_table()),
                costs: Arc::new(InMemoryCostTracker::new()),
                metrics: Arc::new(InMemoryMetricsCollector::new(
                    config.metrics.max_entries,
                    Duration::from_secs(config.metrics.snapshot_interval_secs),
                )),
            },
        )
    }

    /// Hand the metrics collector a sampler of queue and session stats.
    /// Each tick also prunes timed-out sessions.
    pub fn start_auto_snapshot(&self) {
        let pool = Arc::clone(&self.pool);
        let sessions = Arc::clone(&self.sessions);
        let cooldown = Arc::clone(&self.cooldown);
        self.metrics.start_auto_snapshot(Arc::new(move || {
            prune_sessions(sessions.as_ref(), cooldown.as_ref());
            RouterStats {
                queue_stats: pool.queue_stats(),
                session_stats: sessions.stats(),
            }
        }));
    }

    /// Drop timed-out sessions along with their admission windows.
    pub fn prune_inactive_sessions(&self) -> usize {
        prune_sessions(self.sessions.as_ref(), self.cooldown.as_ref())
    }

    pub fn set_default_model(&self, model_id: impl Into<String>) {
        self.resolver.set_default_model(model_id);
    }

    pub fn default_model(&self) -> String {
        self.resolver.default_model()
    }

    pub fn registry(&self) -> &ModelRegistry {
        self.resolver.registry()
    }

    pub fn provider_mapping(&self, model_id: &str) -> Option<&ProviderMapping> {
        self.resolver.mapping(model_id)
    }

    pub fn fallback_chain(&self, model_id: &str) -> Vec<String> {
        self.resolver
            .mapping(model_id)
            .map(|m| m.fallback_chain.clone())
            .unwrap_or_default()
    }

    pub fn models_in_tier(&self, tier: Tier) -> Vec<String> {
        self.resolver
            .registry()
            .in_tier(tier)
            .into_iter()
            .map(|m| m.id.clone())
            .collect()
    }

    /// Resolve without dispatching.
    pub fn detect_provider(
        &self,
        model: Option<&str>,
        tier: Option<Tier>,
        custom: Option<&CustomEndpoint>,
    ) -> ResolvedRoute {
        self.resolver
            .detect_provider(model, tier, custom, |queue| self.pool.has_provider(queue))
    }

    pub fn queue_stats(&self) -> QueueStats {
        self.pool.queue_stats()
    }

    pub fn session_stats(&self) -> SessionStats {
        self.sessions.stats()
    }

    pub async fn route_request(&self, payload: RoutePayload) -> Result<RoutedResponse, AppError> {
        let started = Instant::now();
        let now = Utc::now();

        if !self.sessions.has_session(&payload.session_id) {
            self.sessions.register_session(&payload.session_id);
        }
        self.sessions.heartbeat(&payload.session_id);

        let route = self.detect_provider(
            payload.model.as_deref(),
            payload.tier,
            payload.custom_config.as_ref(),
        );

        let api_key_hash = payload
            .custom_config
            .as_ref()
            .and_then(|c| c.api_key.as_deref())
            .map(hash_api_key);
        let active_sessions = self.sessions.active_session_count().max(1);
        let session = self.sessions.get_session(&payload.session_id);
        let status = self.cooldown.cooldown_status(
            session.as_ref(),
            &route.provider,
            api_key_hash.as_deref(),
            active_sessions,
            now,
        );

        if !status.can_request {
            debug!(
                session = %payload.session_id,
                agent = %payload.agent_id,
                provider = %route.provider,
                wait_ms = status.wait_ms,
                "Request rejected by fair-share cooldown"
            );
            self.metrics.record_request(RequestMetric {
                timestamp: now,
                provider: route.provider.clone(),
                model: route.model.clone(),
                session_id: payload.session_id.clone(),
                agent_id: payload.agent_id.clone(),
                success: false,
                cooldown_hit: true,
                wait_ms: elapsed_ms(started),
                exec_ms: 0,
                error: Some(format!("cooldown: wait {} ms", status.wait_ms)),
            });
            return Err(AppError::RateLimitCooldown {
                wait_ms: status.wait_ms,
                next_allowed_at: status.next_allowed_at,
                active_games: active_sessions,
            });
        }

        self.sessions.record_request(&payload.session_id);

        let request = InferenceRequest {
            model: route.model.clone(),
            prompt: payload.prompt,
            max_tokens: payload.max_tokens,
            temperature: payload.temperature,
            endpoint: payload.custom_config,
        };
        let wait_ms = elapsed_ms(started);
        let dispatched = Instant::now();
        let outcome = self
            .pool
            .execute(
                &route.queue_name,
                request,
                &payload.agent_id,
                &payload.session_id,
            )
            .await;
        let exec_ms = elapsed_ms(dispatched);

        self.metrics.record_request(RequestMetric {
            timestamp: Utc::now(),
            provider: route.provider.clone(),
            model: route.model.clone(),
            session_id: payload.session_id.clone(),
            agent_id: payload.agent_id.clone(),
            success: outcome.is_ok(),
            cooldown_hit: false,
            wait_ms,
            exec_ms,
            error: outcome.as_ref().err().map(|e| format!("{e:#}")),
        });

        let response = match outcome {
            Ok(response) => response,
            Err(e) => {
                warn!(
                    provider = %route.provider,
                    model = %route.model,
                    session = %payload.session_id,
                    agent = %payload.agent_id,
                    error = %format!("{e:#}"),
                    "Provider execution failed"
                );
                return Err(AppError::ProviderExecution {
                    provider: route.provider,
                    model: route.model,
                    session_id: payload.session_id,
                    agent_id: payload.agent_id,
                    message: format!("{e:#}"),
                });
            }
        };

        let model_config = self.resolver.registry().get(&route.model);
        self.costs.record_cost(CostEntry {
            timestamp: Utc::now(),
            provider: route.provider.clone(),
            model: route.model.clone(),
            session_id: payload.session_id.clone(),
            agent_id: payload.agent_id.clone(),
            input_tokens: response.input_tokens,
            output_tokens: response.output_tokens,
            cost_usd: model_config
                .map(|m| m.cost_for(response.input_tokens, response.output_tokens))
                .unwrap_or(0.0),
            api_key_hash: api_key_hash.clone(),
        });

        let session = self.sessions.get_session(&payload.session_id);
        let cooldown = self.cooldown.cooldown_status(
            session.as_ref(),
            &route.provider,
            api_key_hash.as_deref(),
            active_sessions,
            Utc::now(),
        );
        let rpm = model_config
            .map(|m| m.requests_per_minute)
            .or_else(|| self.resolver.registry().provider_rpm(&route.provider))
            .unwrap_or(RateLimitConfig::default().requests_per_minute);

        debug!(
            provider = %route.provider,
            model = %route.model,
            agent = %payload.agent_id,
            wait_ms,
            exec_ms,
            "Request completed"
        );

        Ok(RoutedResponse {
            response,
            provider: route.provider,
            model: route.model,
            queue_name: route.queue_name,
            source: route.source,
            fallback_chain: route.fallback_chain,
            cooldown,
            effective_requests_per_minute: f64::from(rpm) / active_sessions as f64,
            wait_ms,
            exec_ms,
        })
    }
}

fn prune_sessions(sessions: &dyn SessionManager, cooldown: &dyn CooldownPolicy) -> usize {
    let pruned = sessions.prune_inactive();
    for session_id in &pruned {
        cooldown.forget_session(session_id);
    }
    pruned.len()
}

fn elapsed_ms(since: Instant) -> u64 {
    since.elapsed().as_millis() as u64
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
