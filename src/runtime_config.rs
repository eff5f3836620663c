//! # Runtime Configuration Module
//!
//! Settings that shape dispatch behaviour, loaded from environment variables
//! or a YAML file.
//!
//! ## Environment Variables
//!
//! | Variable | Field | Example |
//! |----------|-------|---------|
//! | `MODROUTER_CHAIN_TIMEOUT_MS` | `chain_timeout_ms` | `250` |
//! | `MODROUTER_ROUTE_CACHE_CAPACITY` | `route_cache_capacity` | `10000` |
//! | `MODROUTER_SLOW_MATCH_US` | `slow_match_threshold_us` | `0x3e8` or `1000` |
//!
//! Unset variables keep their defaults.
//!
//! ## YAML
//!
//! ```yaml
//! chain_timeout_ms: 250
//! route_cache_capacity: 10000
//! slow_match_threshold_us: 1000
//! default_headers:
//!   X-Powered-By: modrouter
//!   X-Frame-Options: DENY
//! ```

use std::collections::BTreeMap;
use std::env;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

pub const ENV_CHAIN_TIMEOUT_MS: &str = "MODROUTER_CHAIN_TIMEOUT_MS";
pub const ENV_ROUTE_CACHE_CAPACITY: &str = "MODROUTER_ROUTE_CACHE_CAPACITY";
pub const ENV_SLOW_MATCH_US: &str = "MODROUTER_SLOW_MATCH_US";

const DEFAULT_SLOW_MATCH_US: u64 = 1000;

/// Dispatch settings for an [`Application`](crate::Application).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RouterConfig {
    /// Headers added to every response that does not set them itself
    pub default_headers: BTreeMap<String, String>,
    /// Deadline for one run of a middleware chain; unset means no deadline
    pub chain_timeout_ms: Option<u64>,
    /// Upper bound on cached route resolutions; unset means unbounded
    pub route_cache_capacity: Option<usize>,
    /// Disable the resolved-route cache entirely
    pub route_cache_enabled: bool,
    /// Trie matches slower than this are logged at WARN
    pub slow_match_threshold_us: u64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        let mut default_headers = BTreeMap::new();
        default_headers.insert("X-Powered-By".to_string(), "modrouter".to_string());
        Self {
            default_headers,
            chain_timeout_ms: None,
            route_cache_capacity: None,
            route_cache_enabled: true,
            slow_match_threshold_us: DEFAULT_SLOW_MATCH_US,
        }
    }
}

impl RouterConfig {
    /// Defaults overridden by any `MODROUTER_*` variables that are set.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Some(ms) = read_env(ENV_CHAIN_TIMEOUT_MS)? {
            config.chain_timeout_ms = Some(ms);
        }
        if let Some(capacity) = read_env(ENV_ROUTE_CACHE_CAPACITY)? {
            config.route_cache_capacity = Some(usize::try_from(capacity).with_context(|| {
                format!("{ENV_ROUTE_CACHE_CAPACITY}={capacity} does not fit in usize")
            })?);
        }
        if let Some(us) = read_env(ENV_SLOW_MATCH_US)? {
            config.slow_match_threshold_us = us;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml).context("Failed to parse router config YAML")?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a YAML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read router config {}", path.display()))?;
        Self::from_yaml_str(&yaml).with_context(|| format!("Invalid router config {}", path.display()))
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.route_cache_capacity == Some(0) {
            return Err(ConfigError::InvalidConfig {
                reason: "route_cache_capacity must be at least 1; set route_cache_enabled: false to disable caching".to_string(),
            });
        }
        if self.chain_timeout_ms == Some(0) {
            return Err(ConfigError::InvalidConfig {
                reason: "chain_timeout_ms must be at least 1".to_string(),
            });
        }
        if let Some(name) = self
            .default_headers
            .keys()
            .find(|name| http::HeaderName::from_bytes(name.as_bytes()).is_err())
        {
            return Err(ConfigError::InvalidConfig {
                reason: format!("'{name}' is not a valid header name"),
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn chain_timeout(&self) -> Option<Duration> {
        self.chain_timeout_ms.map(Duration::from_millis)
    }

    #[must_use]
    pub fn slow_match_threshold(&self) -> Duration {
        Duration::from_micros(self.slow_match_threshold_us)
    }
}

/// Parse a numeric variable, accepting decimal or `0x` hexadecimal.
fn read_env(name: &str) -> Result<Option<u64>> {
    let Ok(raw) = env::var(name) else {
        return Ok(None);
    };
    let raw = raw.trim();
    let parsed = match raw.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => raw.parse(),
    };
    parsed
        .map(Some)
        .with_context(|| format!("{name}={raw} is not a number"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = RouterConfig::default();
        assert_eq!(
            config.default_headers.get("X-Powered-By").map(String::as_str),
            Some("modrouter")
        );
        assert!(config.route_cache_enabled);
        assert_eq!(config.chain_timeout(), None);
        assert_eq!(config.slow_match_threshold(), Duration::from_millis(1));
    }

    #[test]
    fn yaml_overrides_and_keeps_defaults() {
        let config = RouterConfig::from_yaml_str("chain_timeout_ms: 50\n").unwrap();
        assert_eq!(config.chain_timeout(), Some(Duration::from_millis(50)));
        assert!(config.default_headers.contains_key("X-Powered-By"));
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let err = RouterConfig::from_yaml_str("route_cache_capacity: 0\n").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(RouterConfig::from_yaml_str("stack_size: 16384\n").is_err());
    }

    #[test]
    fn bad_header_name_is_rejected() {
        let yaml = "default_headers:\n  \"bad header\": x\n";
        assert!(RouterConfig::from_yaml_str(yaml).is_err());
    }
}
