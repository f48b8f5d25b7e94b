use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

/// One running game/simulation instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub heartbeat_time: DateTime<Utc>,
    /// Time of the last dispatched request, if any.
    pub last_request_time: Option<DateTime<Utc>>,
    pub request_count: u64,
}

impl Session {
    pub fn new(session_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            session_id: session_id.into(),
            created_at: now,
            heartbeat_time: now,
            last_request_time: None,
            request_count: 0,
        }
    }

    /// Active while the last heartbeat is within `timeout` of `now`.
    pub fn is_active(&self, now: DateTime<Utc>, timeout: TimeDelta) -> bool {
        now - self.heartbeat_time <= timeout
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub total_sessions: usize,
    pub active_sessions: usize,
    pub total_requests: u64,
}
