//! Fair-share admission between game sessions sharing provider quotas.
//!
//! Two policies ship: [`NoCooldown`] admits every request and leaves
//! throttling to the provider pool's own concurrency limits, and
//! [`FairShareCooldown`] spaces each session's requests by
//! `(60000 / requests_per_minute) * active_sessions` milliseconds.

use ads_config::{CooldownPolicyKind, RateLimitTable};
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::state::Session;

/// Whether a session may issue its next request now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CooldownStatus {
    pub can_request: bool,
    pub wait_ms: u64,
    pub next_allowed_at: DateTime<Utc>,
}

pub trait CooldownPolicy: Send + Sync {
    /// Minimum gap in milliseconds between two requests of one session.
    fn calculate_cooldown(
        &self,
        provider: &str,
        api_key_hash: Option<&str>,
        active_sessions: usize,
    ) -> u64;

    /// Combine the cooldown with the session's last request time.
    fn cooldown_status(
        &self,
        session: Option<&Session>,
        provider: &str,
        api_key_hash: Option<&str>,
        active_sessions: usize,
        now: DateTime<Utc>,
    ) -> CooldownStatus {
        let cooldown_ms = self.calculate_cooldown(provider, api_key_hash, active_sessions);
        status_from(session.and_then(|s| s.last_request_time), cooldown_ms, now)
    }

    /// Drop any per-session state kept for a session that ended.
    fn forget_session(&self, _session_id: &str) {}
}

fn status_from(
    last_request: Option<DateTime<Utc>>,
    cooldown_ms: u64,
    now: DateTime<Utc>,
) -> CooldownStatus {
    let next_allowed_at = match last_request {
        Some(last) => last + TimeDelta::milliseconds(cooldown_ms as i64),
        None => now,
    };
    wait_until(next_allowed_at, now)
}

fn wait_until(next_allowed_at: DateTime<Utc>, now: DateTime<Utc>) -> CooldownStatus {
    let wait_ms = (next_allowed_at - now).num_milliseconds().max(0) as u64;
    CooldownStatus {
        can_request: wait_ms == 0,
        wait_ms,
        next_allowed_at,
    }
}

/// Always admits. Downstream concurrency limits are the only throttle.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCooldown;

impl CooldownPolicy for NoCooldown {
    fn calculate_cooldown(&self, _: &str, _: Option<&str>, _: usize) -> u64 {
        0
    }
}

type WindowKey = (String, String, Option<String>);

/// Spreads each provider's request budget evenly across active sessions.
#[derive(Debug)]
pub struct FairShareCooldown {
    rate_limits: RateLimitTable,
    /// Highest `next_allowed_at` handed out per (session, provider, key).
    high_water: Mutex<HashMap<WindowKey, DateTime<Utc>>>,
}

impl FairShareCooldown {
    pub fn new(rate_limits: RateLimitTable) -> Self {
        Self {
            rate_limits,
            high_water: Mutex::new(HashMap::new()),
        }
    }

    /// Windows still pending, across all sessions.
    pub fn pending_windows(&self) -> usize {
        self.high_water
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl CooldownPolicy for FairShareCooldown {
    fn calculate_cooldown(
        &self,
        provider: &str,
        api_key_hash: Option<&str>,
        active_sessions: usize,
    ) -> u64 {
        let limits = self.rate_limits.lookup(provider, api_key_hash);
        let per_request_ms = 60_000 / u64::from(limits.requests_per_minute.max(1));
        per_request_ms * active_sessions.max(1) as u64
    }

    fn cooldown_status(
        &self,
        session: Option<&Session>,
        provider: &str,
        api_key_hash: Option<&str>,
        active_sessions: usize,
        now: DateTime<Utc>,
    ) -> CooldownStatus {
        let cooldown_ms = self.calculate_cooldown(provider, api_key_hash, active_sessions);
        let status = status_from(session.and_then(|s| s.last_request_time), cooldown_ms, now);
        let Some(session) = session else {
            return status;
        };

        // A drop in active sessions shortens the cooldown; never move the
        // window backwards for a session that already saw a later one.
        let key = (
            session.session_id.clone(),
            provider.to_string(),
            api_key_hash.map(str::to_string),
        );
        let mut high_water = self
            .high_water
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let next_allowed_at = match high_water.get(&key) {
            Some(previous) if *previous > status.next_allowed_at => *previous,
            _ => status.next_allowed_at,
        };
        // Only windows still in the future constrain anything.
        high_water.retain(|_, at| *at > now);
        if next_allowed_at > now {
            high_water.insert(key, next_allowed_at);
        }
        wait_until(next_allowed_at, now)
    }

    fn forget_session(&self, session_id: &str) {
        self.high_water
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(session, _, _), _| session != session_id);
    }
}

/// Build the configured admission policy.
pub fn policy_for(kind: CooldownPolicyKind, rate_limits: RateLimitTable) -> Arc<dyn CooldownPolicy> {
    match kind {
        CooldownPolicyKind::None => Arc::new(NoCooldown),
        CooldownPolicyKind::FairShare => Arc::new(FairShareCooldown::new(rate_limits)),
    }
}
