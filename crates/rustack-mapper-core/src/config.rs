//! Mapper configuration.

use std::env;

/// Defaults applied to every search built by the mapper.
#[derive(Debug, Clone)]
pub struct MapperConfig {
    /// Reject selections a local secondary index cannot serve (default: true).
    pub strict: bool,
    /// Default `ConsistentRead` for new searches (default: false).
    pub consistent: bool,
    /// Extra pages a cursor follows on every refill (default: 0).
    pub prefetch: usize,
}

impl MapperConfig {
    /// Create configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            strict: env_bool("MAPPER_STRICT", defaults.strict),
            consistent: env_bool("MAPPER_CONSISTENT_READ", defaults.consistent),
            prefetch: env::var("MAPPER_PREFETCH")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.prefetch),
        }
    }
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            strict: true,
            consistent: false,
            prefetch: 0,
        }
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key).map_or(default, |v| {
        matches!(v.as_str(), "1" | "true" | "yes" | "TRUE" | "YES")
    })
}
