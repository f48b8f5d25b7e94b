//! Provider detection helpers for endpoints and model ids that are not (or
//! not reachably) in the registry.

use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::LazyLock;

/// Caller-supplied endpoint that bypasses registry routing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomEndpoint {
    pub base_url: String,
    /// Never logged or stored; only its hash leaves the router.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

const KNOWN_ENDPOINTS: &[(&str, &str)] = &[
    ("api.groq.com", "groq"),
    ("api.cerebras.ai", "cerebras"),
    ("openrouter.ai", "openrouter"),
    ("api.openai.com", "openai"),
    ("api.anthropic.com", "anthropic"),
    ("generativelanguage.googleapis.com", "google"),
    ("api.together.xyz", "together"),
    ("localhost:11434", "ollama"),
    ("127.0.0.1:11434", "ollama"),
];

/// Map an endpoint URL to a provider name.
///
/// Unrecognized URLs get `custom-<hash>` so that two different endpoints never
/// share a provider name and never collide with a known provider.
pub fn classify_endpoint(url: &str) -> String {
    let lowered = url.to_ascii_lowercase();
    for (needle, provider) in KNOWN_ENDPOINTS {
        if lowered.contains(needle) {
            return (*provider).to_string();
        }
    }
    let digest = Sha256::digest(lowered.trim_end_matches('/').as_bytes());
    let short: String = digest.iter().take(6).map(|b| format!("{b:02x}")).collect();
    format!("custom-{short}")
}

/// Names that predate the registry, mapped to `(provider, model)`.
const LEGACY_ALIASES: &[(&str, &str, &str)] = &[
    ("llama-8b", "groq", "llama-3.1-8b-instant"),
    ("llama-70b", "groq", "llama-3.3-70b-versatile"),
    ("llama3-70b-8192", "groq", "llama-3.3-70b-versatile"),
    ("llama3-8b-8192", "groq", "llama-3.1-8b-instant"),
    ("qwen-32b", "groq", "qwen/qwen3-32b"),
    ("cerebras-70b", "cerebras", "llama-3.3-70b"),
];

/// Resolve a legacy alias to `(provider, model)`.
pub fn legacy_alias(model: &str) -> Option<(&'static str, &'static str)> {
    LEGACY_ALIASES
        .iter()
        .find(|(alias, _, _)| *alias == model)
        .map(|(_, provider, model)| (*provider, *model))
}

static PROVIDER_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        // ollama tags: `name:size`
        (r"^[a-z0-9.\-]+:[a-z0-9.\-]+$", "ollama"),
        // vendor/model namespaces
        (r"^[^/]+/.+$", "openrouter"),
        (r"^(gpt-|o[134](-|$)|chatgpt)", "openai"),
        (r"^claude", "anthropic"),
        (r"^gemini", "google"),
        (r"^(llama|mixtral|gemma)", "groq"),
        (r"^qwen", "cerebras"),
    ]
    .into_iter()
    .filter_map(|(pattern, provider)| Regex::new(pattern).ok().map(|re| (re, provider)))
    .collect()
});

/// Guess the provider from the shape of a model id. First match wins.
pub fn infer_provider(model: &str) -> Option<&'static str> {
    let lowered = model.to_ascii_lowercase();
    PROVIDER_PATTERNS
        .iter()
        .find(|(re, _)| re.is_match(&lowered))
        .map(|(_, provider)| *provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_known_endpoints() {
        assert_eq!(classify_endpoint("https://api.groq.com/openai/v1"), "groq");
        assert_eq!(classify_endpoint("https://openrouter.ai/api/v1"), "openrouter");
        assert_eq!(classify_endpoint("http://localhost:11434/v1"), "ollama");
        assert_eq!(classify_endpoint("HTTPS://API.CEREBRAS.AI/v1"), "cerebras");
    }

    #[test]
    fn test_classify_unknown_endpoint_is_stable_and_distinct() {
        let a = classify_endpoint("https://llm.example.com/v1");
        let b = classify_endpoint("https://llm.example.org/v1");
        assert!(a.starts_with("custom-"));
        assert_eq!(a.len(), "custom-".len() + 12);
        assert_eq!(a, classify_endpoint("https://llm.example.com/v1/"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_legacy_alias_lookup() {
        assert_eq!(
            legacy_alias("llama-70b"),
            Some(("groq", "llama-3.3-70b-versatile"))
        );
        assert_eq!(legacy_alias("not-an-alias"), None);
    }

    #[test]
    fn test_infer_provider_by_shape() {
        assert_eq!(infer_provider("qwen3:8b"), Some("ollama"));
        assert_eq!(infer_provider("mistralai/mistral-7b-instruct"), Some("openrouter"));
        assert_eq!(infer_provider("gpt-4o-mini"), Some("openai"));
        assert_eq!(infer_provider("o3"), Some("openai"));
        assert_eq!(infer_provider("claude-sonnet-4"), Some("anthropic"));
        assert_eq!(infer_provider("gemini-2.5-flash"), Some("google"));
        assert_eq!(infer_provider("llama-4-scout"), Some("groq"));
        assert_eq!(infer_provider("qwen-3-coder"), Some("cerebras"));
        assert_eq!(infer_provider("totally-unknown"), None);
    }
}
