//! Resolver settings.

use crate::cache::DEFAULT_MAX_SCOPES;
use crate::path::{SearchLimits, DEFAULT_MAX_DEPTH};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables for resolution and index caching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResolverConfig {
    /// Search bound used when a request does not give one.
    pub max_depth: usize,
    /// Wall-clock budget per search, in milliseconds. `None` disables it.
    pub time_budget_ms: Option<u64>,
    /// How long a built index is reused before it is rebuilt.
    pub cache_ttl_secs: u64,
    /// Most scopes kept in the index cache at once.
    pub cache_max_scopes: usize,
    pub default_language: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            time_budget_ms: Some(2_000),
            cache_ttl_secs: 300,
            cache_max_scopes: DEFAULT_MAX_SCOPES,
            default_language: "en".to_string(),
        }
    }
}

impl ResolverConfig {
    pub fn from_json(source: &str) -> serde_json::Result<Self> {
        serde_json::from_str(source)
    }

    pub fn time_budget(&self) -> Option<Duration> {
        self.time_budget_ms.map(Duration::from_millis)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Search limits, with an optional per-request depth override.
    pub fn limits(&self, max_depth: Option<usize>) -> SearchLimits {
        SearchLimits {
            max_depth: max_depth.unwrap_or(self.max_depth),
            time_budget: self.time_budget(),
        }
    }
}
