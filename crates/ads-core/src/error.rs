use chrono::{DateTime, Utc};

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    /// Fair-share admission rejected the request; the caller should wait.
    #[error("Rate limit cooldown: retry in {wait_ms} ms ({active_games} active games)")]
    RateLimitCooldown {
        wait_ms: u64,
        next_allowed_at: DateTime<Utc>,
        active_games: usize,
    },

    #[error(
        "Provider '{provider}' failed for model '{model}' (session {session_id}, agent {agent_id}): {message}"
    )]
    ProviderExecution {
        provider: String,
        model: String,
        session_id: String,
        agent_id: String,
        message: String,
    },

    #[error("Invalid snapshot for agent '{agent_id}': {field} = {value}")]
    InvalidSnapshot {
        agent_id: String,
        field: &'static str,
        value: f64,
    },

    #[error("Unknown reasoning layer '{0}'")]
    UnknownLayer(String),
}

impl AppError {
    /// Whether this error is the expected "wait and retry" signal.
    pub fn is_cooldown(&self) -> bool {
        matches!(self, Self::RateLimitCooldown { .. })
    }
}
