//! Provider request budgets and per-API-key overrides.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

const DEFAULT_REQUESTS_PER_MINUTE: u32 = 30;
const DEFAULT_BURST_SIZE: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub requests_per_minute: u32,
    #[serde(default = "default_burst_size")]
    pub burst_size: u32,
}

fn default_burst_size() -> u32 {
    DEFAULT_BURST_SIZE
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: DEFAULT_REQUESTS_PER_MINUTE,
            burst_size: DEFAULT_BURST_SIZE,
        }
    }
}

/// Rate limits per provider, with overrides keyed by hashed API key.
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitTable {
    providers: HashMap<String, RateLimitConfig>,
    key_overrides: HashMap<String, RateLimitConfig>,
}

impl RateLimitTable {
    pub fn new(
        providers: HashMap<String, RateLimitConfig>,
        key_overrides: HashMap<String, RateLimitConfig>,
    ) -> Self {
        Self {
            providers,
            key_overrides,
        }
    }

    /// Built-in provider budgets (free-tier limits).
    pub fn builtin() -> Self {
        let providers = [
            ("groq", 30, 5),
            ("cerebras", 30, 5),
            ("openrouter", 20, 3),
            ("ollama", 1_000, 10),
        ]
        .into_iter()
        .map(|(name, rpm, burst)| {
            (
                name.to_string(),
                RateLimitConfig {
                    requests_per_minute: rpm,
                    burst_size: burst,
                },
            )
        })
        .collect();
        Self::new(providers, HashMap::new())
    }

    /// Merge entries over this table; later values win.
    pub fn merged(
        mut self,
        providers: &HashMap<String, RateLimitConfig>,
        key_overrides: &HashMap<String, RateLimitConfig>,
    ) -> Self {
        self.providers
            .extend(providers.iter().map(|(k, v)| (k.clone(), *v)));
        self.key_overrides
            .extend(key_overrides.iter().map(|(k, v)| (k.clone(), *v)));
        self
    }

    /// Lookup order: key override -> provider entry -> default.
    pub fn lookup(&self, provider: &str, api_key_hash: Option<&str>) -> RateLimitConfig {
        api_key_hash
            .and_then(|hash| self.key_overrides.get(hash))
            .or_else(|| self.providers.get(provider))
            .copied()
            .unwrap_or_default()
    }
}

impl Default for RateLimitTable {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Stable short identifier for an API key: first 16 hex chars of SHA-256.
pub fn hash_api_key(api_key: &str) -> String {
    let digest = Sha256::digest(api_key.as_bytes());
    digest
        .iter()
        .take(8)
        .map(|b| format!("{b:02x}"))
        .collect()
}
