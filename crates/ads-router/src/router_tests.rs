use super::*;
use crate::cost::InMemoryCostTracker;
use crate::metrics::InMemoryMetricsCollector;
use crate::provider::QueueStat;
use ads_config::{CooldownPolicyKind, ModelConfig, RateLimitTable, SchedulerConfig};
use ads_session::{FairShareCooldown, InMemorySessionManager, NoCooldown};
use anyhow::{Result, bail};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

/// Pool that records dispatched queues and fails on demand.
#[derive(Default)]
struct StubPool {
    unreachable: HashSet<String>,
    failing: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl StubPool {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProviderPool for StubPool {
    async fn execute(
        &self,
        queue_name: &str,
        request: InferenceRequest,
        _agent_id: &str,
        _session_id: &str,
    ) -> Result<ProviderResponse> {
        self.calls.lock().unwrap().push(queue_name.to_string());
        if self.failing.contains(queue_name) {
            bail!("upstream returned 503");
        }
        Ok(ProviderResponse {
            text: format!("echo: {}", request.prompt),
            input_tokens: 1_000,
            output_tokens: 500,
        })
    }

    fn has_provider(&self, queue_name: &str) -> bool {
        !self.unreachable.contains(queue_name)
    }

    fn queue_stats(&self) -> QueueStats {
        let mut stats = QueueStats::new();
        stats.insert(
            "groq:m50".into(),
            QueueStat {
                completed: self.calls().len() as u64,
                ..Default::default()
            },
        );
        stats
    }
}

struct Harness {
    router: RequestRouter,
    pool: Arc<StubPool>,
    costs: Arc<InMemoryCostTracker>,
    metrics: Arc<InMemoryMetricsCollector>,
    sessions: Arc<InMemorySessionManager>,
}

fn registry() -> ModelRegistry {
    ModelRegistry::new(vec![
        ModelConfig::new("m50", "groq", Tier::Simple, 50).with_pricing(1.0, 2.0),
        ModelConfig::new("m80", "cerebras", Tier::Simple, 80),
        ModelConfig::new("m30", "openrouter", Tier::Simple, 30),
        ModelConfig::new("big", "groq", Tier::High, 20),
    ])
}

fn harness(pool: StubPool, cooldown: Arc<dyn CooldownPolicy>) -> Harness {
    let pool = Arc::new(pool);
    let costs = Arc::new(InMemoryCostTracker::new());
    let metrics = Arc::new(InMemoryMetricsCollector::new(100, Duration::from_secs(60)));
    let sessions = Arc::new(InMemorySessionManager::new(60_000));
    let router = RequestRouter::new(
        registry(),
        "big",
        RouterCollaborators {
            pool: pool.clone(),
            sessions: sessions.clone(),
            cooldown,
            costs: costs.clone(),
            metrics: metrics.clone(),
        },
    );
    Harness {
        router,
        pool,
        costs,
        metrics,
        sessions,
    }
}

fn payload(session: &str, agent: &str) -> RoutePayload {
    RoutePayload {
        session_id: session.into(),
        agent_id: agent.into(),
        prompt: "hello".into(),
        tier: Some(Tier::Simple),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_tier_requests_rotate_through_throughput_order() {
    let h = harness(StubPool::default(), Arc::new(NoCooldown));
    let mut models = Vec::new();
    for _ in 0..4 {
        let routed = h.router.route_request(payload("g1", "a1")).await.unwrap();
        models.push(routed.model);
    }
    assert_eq!(models, vec!["m80", "m50", "m30", "m80"]);
    assert_eq!(
        h.pool.calls(),
        vec!["cerebras:m80", "groq:m50", "openrouter:m30", "cerebras:m80"]
    );
}

#[tokio::test]
async fn test_success_records_metrics_cost_and_session() {
    let h = harness(StubPool::default(), Arc::new(NoCooldown));
    let routed = h
        .router
        .route_request(RoutePayload {
            model: Some("m50".into()),
            ..payload("g1", "a1")
        })
        .await
        .unwrap();

    assert_eq!(routed.response.text, "echo: hello");
    assert_eq!(routed.provider, "groq");
    assert_eq!(routed.queue_name, "groq:m50");
    assert_eq!(routed.source, RouteSource::Registry);
    assert_eq!(routed.fallback_chain, vec!["cerebras:m80", "openrouter:m30"]);
    assert!(routed.cooldown.can_request);
    assert!((routed.effective_requests_per_minute - 50.0).abs() < 1e-9);

    let metrics = h.metrics.entries();
    assert_eq!(metrics.len(), 1);
    assert!(metrics[0].success);
    assert_eq!(metrics[0].agent_id, "a1");

    let costs = h.costs.entries();
    assert_eq!(costs.len(), 1);
    // 1000 in * $1/M + 500 out * $2/M
    assert!((costs[0].cost_usd - 0.002).abs() < 1e-12);
    assert_eq!(costs[0].api_key_hash, None);

    let session = h.sessions.get_session("g1").unwrap();
    assert_eq!(session.request_count, 1);
}

#[tokio::test]
async fn test_provider_failure_records_metric_then_propagates() {
    let pool = StubPool {
        failing: ["groq:m50".to_string()].into_iter().collect(),
        ..Default::default()
    };
    let h = harness(pool, Arc::new(NoCooldown));
    let err = h
        .router
        .route_request(RoutePayload {
            model: Some("m50".into()),
            ..payload("g1", "a7")
        })
        .await
        .unwrap_err();

    match err {
        AppError::ProviderExecution {
            provider,
            model,
            session_id,
            agent_id,
            message,
        } => {
            assert_eq!(provider, "groq");
            assert_eq!(model, "m50");
            assert_eq!(session_id, "g1");
            assert_eq!(agent_id, "a7");
            assert!(message.contains("503"));
        }
        other => panic!("expected ProviderExecution, got {other:?}"),
    }

    let metrics = h.metrics.entries();
    assert_eq!(metrics.len(), 1);
    assert!(!metrics[0].success);
    assert!(metrics[0].error.as_deref().unwrap().contains("503"));
    assert!(h.costs.entries().is_empty(), "no cost on failure");
}

#[tokio::test]
async fn test_fair_share_rejects_second_request_without_dispatch() {
    let policy = Arc::new(FairShareCooldown::new(RateLimitTable::builtin()));
    let h = harness(StubPool::default(), policy);

    let explicit = |agent: &str| RoutePayload {
        model: Some("m50".into()),
        ..payload("g1", agent)
    };

    let first = h.router.route_request(explicit("a1")).await.unwrap();
    assert!(!first.cooldown.can_request, "next window reported to caller");

    let err = h.router.route_request(explicit("a2")).await.unwrap_err();
    match err {
        AppError::RateLimitCooldown {
            wait_ms,
            next_allowed_at,
            active_games,
        } => {
            assert!(wait_ms > 0);
            assert_eq!(next_allowed_at, first.cooldown.next_allowed_at);
            assert_eq!(active_games, 1);
        }
        other => panic!("expected RateLimitCooldown, got {other:?}"),
    }

    assert_eq!(h.pool.calls().len(), 1);
    let totals = h.metrics.totals();
    assert_eq!(totals.requests, 2);
    assert_eq!(totals.cooldown_hits, 1);
    assert_eq!(totals.successes, 1);
}

#[tokio::test]
async fn test_custom_endpoint_hashes_api_key_in_cost_entry() {
    let h = harness(StubPool::default(), Arc::new(NoCooldown));
    let routed = h
        .router
        .route_request(RoutePayload {
            custom_config: Some(CustomEndpoint {
                base_url: "https://api.groq.com/openai/v1".into(),
                api_key: Some("sk-secret".into()),
                model: Some("llama-guard".into()),
            }),
            ..payload("g1", "a1")
        })
        .await
        .unwrap();
    assert_eq!(routed.queue_name, "groq:llama-guard");

    let cost = &h.costs.entries()[0];
    assert_eq!(cost.api_key_hash.as_deref(), Some(hash_api_key("sk-secret").as_str()));
    assert_eq!(cost.cost_usd, 0.0, "unknown model has no pricing");
}

#[tokio::test]
async fn test_unreachable_tier_routes_to_default_and_fails_at_dispatch() {
    let pool = StubPool {
        unreachable: ["groq:m50", "cerebras:m80", "openrouter:m30", "groq:big"]
            .into_iter()
            .map(String::from)
            .collect(),
        failing: ["groq:big".to_string()].into_iter().collect(),
        ..Default::default()
    };
    let h = harness(pool, Arc::new(NoCooldown));
    let err = h.router.route_request(payload("g1", "a1")).await.unwrap_err();
    assert!(matches!(err, AppError::ProviderExecution { ref model, .. } if model == "big"));
    assert_eq!(h.pool.calls(), vec!["groq:big"]);
}

#[tokio::test]
async fn test_effective_rpm_divides_across_sessions() {
    let h = harness(StubPool::default(), Arc::new(NoCooldown));
    h.sessions.register_session("other-game");
    let routed = h
        .router
        .route_request(RoutePayload {
            model: Some("m80".into()),
            ..payload("g1", "a1")
        })
        .await
        .unwrap();
    assert!((routed.effective_requests_per_minute - 40.0).abs() < 1e-9);
    assert_eq!(h.router.session_stats().total_sessions, 2);
}

#[test]
fn test_introspection_helpers() {
    let h = harness(StubPool::default(), Arc::new(NoCooldown));
    assert_eq!(h.router.models_in_tier(Tier::Simple), vec!["m80", "m50", "m30"]);
    assert_eq!(
        h.router.fallback_chain("m50"),
        vec!["cerebras:m80", "openrouter:m30"]
    );
    assert_eq!(h.router.provider_mapping("big").unwrap().provider, "groq");
    assert!(h.router.fallback_chain("nope").is_empty());

    h.router.set_default_model("m30");
    assert_eq!(h.router.default_model(), "m30");
}

#[tokio::test]
async fn test_auto_snapshot_reads_pool_and_sessions() {
    let metrics = Arc::new(InMemoryMetricsCollector::new(10, Duration::from_millis(5)));
    let sessions = Arc::new(InMemorySessionManager::new(60_000));
    sessions.register_session("g1");
    let router = RequestRouter::new(
        registry(),
        "big",
        RouterCollaborators {
            pool: Arc::new(StubPool::default()),
            sessions,
            cooldown: Arc::new(NoCooldown),
            costs: Arc::new(InMemoryCostTracker::new()),
            metrics: metrics.clone(),
        },
    );
    router.start_auto_snapshot();
    tokio::time::sleep(Duration::from_millis(30)).await;
    let snapshot = metrics.latest_snapshot().expect("snapshot");
    assert_eq!(snapshot.stats.session_stats.total_sessions, 1);
    assert!(snapshot.stats.queue_stats.contains_key("groq:m50"));
}

#[tokio::test]
async fn test_pruned_session_loses_its_admission_window() {
    let sessions = Arc::new(InMemorySessionManager::new(1));
    let router = RequestRouter::new(
        registry(),
        "big",
        RouterCollaborators {
            pool: Arc::new(StubPool::default()),
            sessions: sessions.clone(),
            cooldown: Arc::new(FairShareCooldown::new(RateLimitTable::builtin())),
            costs: Arc::new(InMemoryCostTracker::new()),
            metrics: Arc::new(InMemoryMetricsCollector::new(10, Duration::from_secs(60))),
        },
    );
    let explicit = RoutePayload {
        model: Some("m50".into()),
        ..payload("g1", "a1")
    };
    router.route_request(explicit.clone()).await.unwrap();

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(router.prune_inactive_sessions(), 1);
    assert!(!sessions.has_session("g1"));

    // A returning session starts fresh instead of inheriting the old window.
    let routed = router.route_request(explicit).await.unwrap();
    assert_eq!(routed.model, "m50");
    assert_eq!(router.session_stats().total_sessions, 1);
}

#[tokio::test]
async fn test_from_config_applies_policy_and_models() {
    let config = SchedulerConfig {
        models: registry().models().to_vec(),
        router: ads_config::RouterSettings {
            default_model: "big".into(),
            cooldown_policy: CooldownPolicyKind::FairShare,
        },
        ..Default::default()
    };
    let pool = Arc::new(StubPool::default());
    let router = RequestRouter::from_config(&config, pool.clone());
    assert_eq!(router.default_model(), "big");
    assert_eq!(router.provider_mapping("m80").unwrap().provider, "cerebras");

    let explicit = RoutePayload {
        model: Some("m50".into()),
        ..payload("g1", "a1")
    };
    router.route_request(explicit.clone()).await.unwrap();
    let err = router.route_request(explicit).await.unwrap_err();
    assert!(err.is_cooldown());
    assert_eq!(pool.calls().len(), 1);
}

#[tokio::test]
async fn test_from_config_defaults_admit_everything() {
    let router = RequestRouter::from_config(&SchedulerConfig::default(), Arc::new(StubPool::default()));
    for _ in 0..3 {
        router.route_request(payload("g1", "a1")).await.unwrap();
    }
    assert_eq!(router.session_stats().total_requests, 3);
}
