//! Per-(agent, layer) cooldown gate.
//!
//! Agent state lives in striped shards so unrelated agents never contend on
//! one lock. `try_acquire` checks and records under the same shard lock, so
//! two concurrent ticks for one agent cannot both pass.

use ads_config::{LayerConfig, LayerConfigPatch, LayerConfigs};
use ads_core::{ConversationSnapshot, ReasoningLayer};
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Mutex, PoisonError, RwLock};
use tracing::debug;

const SHARDS: usize = 16;

/// Talker cooldown is divided by this while the agent is mid-conversation.
pub const CONVERSATION_COOLDOWN_DIVISOR: u64 = 10;

/// Last invocation time per layer for one agent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentLayerState {
    last_invocation: [Option<DateTime<Utc>>; 3],
}

impl AgentLayerState {
    pub fn last_invocation(&self, layer: ReasoningLayer) -> Option<DateTime<Utc>> {
        self.last_invocation[layer.index()]
    }

    pub fn most_recent(&self) -> Option<DateTime<Utc>> {
        self.last_invocation.iter().flatten().max().copied()
    }
}

/// Outcome of [`CooldownGate::try_acquire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Invocation recorded; the caller may proceed. `previous` is the
    /// timestamp it replaced, for [`CooldownGate::release`].
    Acquired { previous: Option<DateTime<Utc>> },
    CoolingDown { wait_ms: u64 },
    Disabled,
}

#[derive(Debug)]
pub struct CooldownGate {
    layers: RwLock<LayerConfigs>,
    shards: Vec<Mutex<HashMap<String, AgentLayerState>>>,
}

impl CooldownGate {
    pub fn new(layers: LayerConfigs) -> Self {
        Self {
            layers: RwLock::new(layers),
            shards: (0..SHARDS).map(|_| Mutex::new(HashMap::new())).collect(),
        }
    }

    pub fn layer_config(&self, layer: ReasoningLayer) -> LayerConfig {
        self.layers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(layer)
    }

    /// Merge a partial update. Applies to the next readiness check.
    pub fn set_layer_config(&self, layer: ReasoningLayer, patch: &LayerConfigPatch) {
        self.layers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .patch(layer, patch);
    }

    /// Cooldown in force for `layer`, after the conversation adjustment.
    pub fn effective_cooldown_ms(&self, layer: ReasoningLayer, in_conversation: bool) -> u64 {
        let base = self.layer_config(layer).cooldown_ms;
        if layer == ReasoningLayer::Talker && in_conversation {
            base / CONVERSATION_COOLDOWN_DIVISOR
        } else {
            base
        }
    }

    /// Ready when the layer is enabled and at least the effective cooldown has
    /// elapsed since its last invocation for this agent.
    pub fn is_layer_ready(
        &self,
        agent_id: &str,
        layer: ReasoningLayer,
        conversation: Option<&ConversationSnapshot>,
        now: DateTime<Utc>,
    ) -> bool {
        self.time_until_ready(agent_id, layer, conversation, now) == 0
    }

    /// Remaining wait in milliseconds; `u64::MAX` for a disabled layer.
    pub fn time_until_ready(
        &self,
        agent_id: &str,
        layer: ReasoningLayer,
        conversation: Option<&ConversationSnapshot>,
        now: DateTime<Utc>,
    ) -> u64 {
        let config = self.layer_config(layer);
        if !config.enabled {
            return u64::MAX;
        }
        let cooldown = self.effective_cooldown_ms(layer, engaged(conversation));
        let shard = self.shard(agent_id);
        let last = shard
            .get(agent_id)
            .and_then(|state| state.last_invocation(layer));
        remaining_ms(last, cooldown, now)
    }

    pub fn record_invocation(&self, agent_id: &str, layer: ReasoningLayer, now: DateTime<Utc>) {
        let mut shard = self.shard(agent_id);
        shard.entry(agent_id.to_string()).or_default().last_invocation[layer.index()] = Some(now);
    }

    /// Check readiness and record the invocation in one step.
    pub fn try_acquire(
        &self,
        agent_id: &str,
        layer: ReasoningLayer,
        conversation: Option<&ConversationSnapshot>,
        now: DateTime<Utc>,
    ) -> GateDecision {
        let config = self.layer_config(layer);
        if !config.enabled {
            return GateDecision::Disabled;
        }
        let cooldown = self.effective_cooldown_ms(layer, engaged(conversation));

        let mut shard = self.shard(agent_id);
        let last = shard
            .get(agent_id)
            .and_then(|state| state.last_invocation(layer));
        let wait_ms = remaining_ms(last, cooldown, now);
        if wait_ms > 0 {
            return GateDecision::CoolingDown { wait_ms };
        }
        shard.entry(agent_id.to_string()).or_default().last_invocation[layer.index()] = Some(now);
        GateDecision::Acquired { previous: last }
    }

    /// Undo an acquisition whose request never reached a provider. No-op if
    /// the layer was invoked again after `acquired_at`.
    pub fn release(
        &self,
        agent_id: &str,
        layer: ReasoningLayer,
        acquired_at: DateTime<Utc>,
        previous: Option<DateTime<Utc>>,
    ) {
        let mut shard = self.shard(agent_id);
        let Some(state) = shard.get_mut(agent_id) else {
            return;
        };
        let slot = &mut state.last_invocation[layer.index()];
        if *slot != Some(acquired_at) {
            return;
        }
        *slot = previous;
        if state.most_recent().is_none() {
            shard.remove(agent_id);
        }
    }

    /// Clear one layer's timestamp, or all of them when `layer` is `None`.
    pub fn reset_cooldowns(&self, agent_id: &str, layer: Option<ReasoningLayer>) {
        let mut shard = self.shard(agent_id);
        match layer {
            Some(layer) => {
                if let Some(state) = shard.get_mut(agent_id) {
                    state.last_invocation[layer.index()] = None;
                }
            }
            None => {
                shard.remove(agent_id);
            }
        }
    }

    /// Drop agents whose most recent invocation is older than `max_age_ms`.
    /// Returns how many were removed.
    pub fn cleanup_old_states(&self, max_age_ms: u64, now: DateTime<Utc>) -> usize {
        let max_age = TimeDelta::milliseconds(i64::try_from(max_age_ms).unwrap_or(i64::MAX));
        let mut removed = 0;
        for shard in &self.shards {
            let mut shard = shard.lock().unwrap_or_else(PoisonError::into_inner);
            let before = shard.len();
            shard.retain(|_, state| {
                state
                    .most_recent()
                    .is_some_and(|last| now.signed_duration_since(last) <= max_age)
            });
            removed += before - shard.len();
        }
        if removed > 0 {
            debug!(removed, max_age_ms, "Pruned stale agent cooldown state");
        }
        removed
    }

    pub fn state(&self, agent_id: &str) -> Option<AgentLayerState> {
        self.shard(agent_id).get(agent_id).cloned()
    }

    pub fn tracked_agents(&self) -> usize {
        self.shards
            .iter()
            .map(|s| s.lock().unwrap_or_else(PoisonError::into_inner).len())
            .sum()
    }

    fn shard(&self, agent_id: &str) -> std::sync::MutexGuard<'_, HashMap<String, AgentLayerState>> {
        let mut hasher = DefaultHasher::new();
        agent_id.hash(&mut hasher);
        let index = (hasher.finish() as usize) % self.shards.len();
        self.shards[index]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn engaged(conversation: Option<&ConversationSnapshot>) -> bool {
    conversation.is_some_and(ConversationSnapshot::is_engaged)
}

fn remaining_ms(last: Option<DateTime<Utc>>, cooldown_ms: u64, now: DateTime<Utc>) -> u64 {
    let Some(last) = last else {
        return 0;
    };
    let elapsed = now.signed_duration_since(last).num_milliseconds().max(0) as u64;
    cooldown_ms.saturating_sub(elapsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn t(ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(1_700_000_000_000 + ms).unwrap()
    }

    fn talking() -> ConversationSnapshot {
        ConversationSnapshot {
            is_active: true,
            partner_id: Some("b".into()),
            participant_ids: vec![],
        }
    }

    #[test]
    fn test_first_access_is_ready_and_creates_no_state() {
        let gate = CooldownGate::new(LayerConfigs::default());
        assert!(gate.is_layer_ready("a", ReasoningLayer::Executor, None, t(0)));
        assert_eq!(gate.tracked_agents(), 0);
    }

    #[test]
    fn test_cooldown_boundary_is_inclusive() {
        let gate = CooldownGate::new(LayerConfigs::default());
        gate.record_invocation("a", ReasoningLayer::Autonomic, t(0));
        assert!(!gate.is_layer_ready("a", ReasoningLayer::Autonomic, None, t(999)));
        assert_eq!(gate.time_until_ready("a", ReasoningLayer::Autonomic, None, t(400)), 600);
        assert!(gate.is_layer_ready("a", ReasoningLayer::Autonomic, None, t(1_000)));
    }

    #[test]
    fn test_layers_are_independent() {
        let gate = CooldownGate::new(LayerConfigs::default());
        gate.record_invocation("a", ReasoningLayer::Executor, t(0));
        assert!(gate.is_layer_ready("a", ReasoningLayer::Talker, None, t(1)));
        assert!(gate.is_layer_ready("b", ReasoningLayer::Executor, None, t(1)));
    }

    #[test]
    fn test_talker_cooldown_shrinks_in_conversation() {
        let gate = CooldownGate::new(LayerConfigs::default());
        let conversation = talking();
        gate.record_invocation("a", ReasoningLayer::Talker, t(0));
        assert!(gate.is_layer_ready("a", ReasoningLayer::Talker, Some(&conversation), t(2_000)));
        assert!(!gate.is_layer_ready("a", ReasoningLayer::Talker, None, t(2_000)));
        assert_eq!(gate.time_until_ready("a", ReasoningLayer::Talker, None, t(2_000)), 18_000);
    }

    #[test]
    fn test_conversation_does_not_shorten_other_layers() {
        let gate = CooldownGate::new(LayerConfigs::default());
        assert_eq!(gate.effective_cooldown_ms(ReasoningLayer::Executor, true), 5_000);
        assert_eq!(gate.effective_cooldown_ms(ReasoningLayer::Talker, true), 2_000);
    }

    #[test]
    fn test_disabled_layer_is_never_ready() {
        let gate = CooldownGate::new(LayerConfigs::default());
        gate.set_layer_config(
            ReasoningLayer::Autonomic,
            &LayerConfigPatch {
                enabled: Some(false),
                ..Default::default()
            },
        );
        assert!(!gate.is_layer_ready("a", ReasoningLayer::Autonomic, None, t(0)));
        assert_eq!(
            gate.try_acquire("a", ReasoningLayer::Autonomic, None, t(0)),
            GateDecision::Disabled
        );
        assert_eq!(gate.tracked_agents(), 0);
    }

    #[test]
    fn test_config_change_applies_to_next_check() {
        let gate = CooldownGate::new(LayerConfigs::default());
        gate.record_invocation("a", ReasoningLayer::Executor, t(0));
        assert!(!gate.is_layer_ready("a", ReasoningLayer::Executor, None, t(1_000)));
        gate.set_layer_config(
            ReasoningLayer::Executor,
            &LayerConfigPatch {
                cooldown_ms: Some(500),
                ..Default::default()
            },
        );
        assert!(gate.is_layer_ready("a", ReasoningLayer::Executor, None, t(1_000)));
        assert_eq!(gate.layer_config(ReasoningLayer::Executor).priority, 3);
    }

    #[test]
    fn test_try_acquire_records_only_when_ready() {
        let gate = CooldownGate::new(LayerConfigs::default());
        assert_eq!(
            gate.try_acquire("a", ReasoningLayer::Executor, None, t(0)),
            GateDecision::Acquired { previous: None }
        );
        assert_eq!(
            gate.try_acquire("a", ReasoningLayer::Executor, None, t(1_500)),
            GateDecision::CoolingDown { wait_ms: 3_500 }
        );
        let state = gate.state("a").unwrap();
        assert_eq!(state.last_invocation(ReasoningLayer::Executor), Some(t(0)));
    }

    #[test]
    fn test_concurrent_acquire_admits_exactly_one() {
        let gate = Arc::new(CooldownGate::new(LayerConfigs::default()));
        let acquired = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let gate = Arc::clone(&gate);
                let acquired = Arc::clone(&acquired);
                std::thread::spawn(move || {
                    if matches!(
                        gate.try_acquire("a", ReasoningLayer::Talker, None, t(0)),
                        GateDecision::Acquired { .. }
                    ) {
                        acquired.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(acquired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_release_restores_previous_invocation() {
        let gate = CooldownGate::new(LayerConfigs::default());
        gate.record_invocation("a", ReasoningLayer::Autonomic, t(0));
        let GateDecision::Acquired { previous } =
            gate.try_acquire("a", ReasoningLayer::Autonomic, None, t(1_000))
        else {
            panic!("expected acquisition");
        };
        assert_eq!(previous, Some(t(0)));

        gate.release("a", ReasoningLayer::Autonomic, t(1_000), previous);
        assert!(gate.is_layer_ready("a", ReasoningLayer::Autonomic, None, t(1_001)));
        assert_eq!(
            gate.state("a").unwrap().last_invocation(ReasoningLayer::Autonomic),
            Some(t(0))
        );
    }

    #[test]
    fn test_release_skips_newer_invocation_and_drops_empty_state() {
        let gate = CooldownGate::new(LayerConfigs::default());
        gate.try_acquire("a", ReasoningLayer::Executor, None, t(0));
        gate.record_invocation("a", ReasoningLayer::Executor, t(10));
        gate.release("a", ReasoningLayer::Executor, t(0), None);
        assert_eq!(
            gate.state("a").unwrap().last_invocation(ReasoningLayer::Executor),
            Some(t(10))
        );

        gate.try_acquire("b", ReasoningLayer::Executor, None, t(0));
        gate.release("b", ReasoningLayer::Executor, t(0), None);
        assert!(gate.state("b").is_none());
        assert_eq!(gate.tracked_agents(), 1);
    }

    #[test]
    fn test_reset_single_layer_or_all() {
        let gate = CooldownGate::new(LayerConfigs::default());
        gate.record_invocation("a", ReasoningLayer::Talker, t(0));
        gate.record_invocation("a", ReasoningLayer::Executor, t(0));

        gate.reset_cooldowns("a", Some(ReasoningLayer::Talker));
        assert!(gate.is_layer_ready("a", ReasoningLayer::Talker, None, t(1)));
        assert!(!gate.is_layer_ready("a", ReasoningLayer::Executor, None, t(1)));

        gate.reset_cooldowns("a", None);
        assert!(gate.is_layer_ready("a", ReasoningLayer::Executor, None, t(1)));
        assert!(gate.state("a").is_none());

        gate.reset_cooldowns("unknown", None);
    }

    #[test]
    fn test_cleanup_removes_only_stale_agents() {
        let gate = CooldownGate::new(LayerConfigs::default());
        gate.record_invocation("old", ReasoningLayer::Autonomic, t(0));
        gate.record_invocation("edge", ReasoningLayer::Autonomic, t(40_000));
        gate.record_invocation("mixed", ReasoningLayer::Autonomic, t(0));
        gate.record_invocation("mixed", ReasoningLayer::Talker, t(90_000));

        let removed = gate.cleanup_old_states(60_000, t(100_000));
        assert_eq!(removed, 1);
        assert!(gate.state("old").is_none());
        assert!(gate.state("edge").is_some(), "exactly max_age old is retained");
        assert!(gate.state("mixed").is_some());
    }
}
