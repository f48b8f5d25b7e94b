//! Session registry consumed by the router.

use chrono::{DateTime, TimeDelta, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

use crate::state::{Session, SessionStats};

/// Heartbeat and request bookkeeping for game sessions.
pub trait SessionManager: Send + Sync {
    fn has_session(&self, session_id: &str) -> bool;
    fn register_session(&self, session_id: &str);
    fn heartbeat(&self, session_id: &str);
    fn record_request(&self, session_id: &str);
    fn get_session(&self, session_id: &str) -> Option<Session>;
    /// Sessions whose heartbeat has not timed out.
    fn active_session_count(&self) -> usize;
    fn stats(&self) -> SessionStats;
    /// Drop sessions whose heartbeat timed out and return their ids.
    fn prune_inactive(&self) -> Vec<String>;
}

#[derive(Debug)]
pub struct InMemorySessionManager {
    sessions: Mutex<HashMap<String, Session>>,
    timeout: TimeDelta,
}

impl InMemorySessionManager {
    pub fn new(timeout_ms: u64) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            timeout: TimeDelta::milliseconds(timeout_ms as i64),
        }
    }

    pub fn register_session_at(&self, session_id: &str, now: DateTime<Utc>) {
        let mut sessions = self.lock();
        if !sessions.contains_key(session_id) {
            debug!(session = %session_id, "Registered session");
            sessions.insert(session_id.to_string(), Session::new(session_id, now));
        }
    }

    pub fn heartbeat_at(&self, session_id: &str, now: DateTime<Utc>) {
        match self.lock().get_mut(session_id) {
            Some(session) => session.heartbeat_time = now,
            None => debug!(session = %session_id, "Heartbeat for unknown session ignored"),
        }
    }

    pub fn record_request_at(&self, session_id: &str, now: DateTime<Utc>) {
        if let Some(session) = self.lock().get_mut(session_id) {
            session.last_request_time = Some(now);
            session.request_count += 1;
        }
    }

    pub fn active_session_count_at(&self, now: DateTime<Utc>) -> usize {
        self.lock()
            .values()
            .filter(|s| s.is_active(now, self.timeout))
            .count()
    }

    pub fn prune_inactive_at(&self, now: DateTime<Utc>) -> Vec<String> {
        let mut sessions = self.lock();
        let expired: Vec<String> = sessions
            .values()
            .filter(|s| !s.is_active(now, self.timeout))
            .map(|s| s.session_id.clone())
            .collect();
        for id in &expired {
            sessions.remove(id);
        }
        if !expired.is_empty() {
            debug!(pruned = expired.len(), "Pruned inactive sessions");
        }
        expired
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Session>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SessionManager for InMemorySessionManager {
    fn has_session(&self, session_id: &str) -> bool {
        self.lock().contains_key(session_id)
    }

    fn register_session(&self, session_id: &str) {
        self.register_session_at(session_id, Utc::now());
    }

    fn heartbeat(&self, session_id: &str) {
        self.heartbeat_at(session_id, Utc::now());
    }

    fn record_request(&self, session_id: &str) {
        self.record_request_at(session_id, Utc::now());
    }

    fn get_session(&self, session_id: &str) -> Option<Session> {
        self.lock().get(session_id).cloned()
    }

    fn active_session_count(&self) -> usize {
        self.active_session_count_at(Utc::now())
    }

    fn stats(&self) -> SessionStats {
        let now = Utc::now();
        let sessions = self.lock();
        SessionStats {
            total_sessions: sessions.len(),
            active_sessions: sessions
                .values()
                .filter(|s| s.is_active(now, self.timeout))
                .count(),
            total_requests: sessions.values().map(|s| s.request_count).sum(),
        }
    }

    fn prune_inactive(&self) -> Vec<String> {
        self.prune_inactive_at(Utc::now())
    }
}
