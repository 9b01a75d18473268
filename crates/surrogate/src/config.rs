//! Proxy engine configuration.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::resource::DEFAULT_MAX_DISPATCH_DEPTH;

/// Settings shared by every proxy a [`ProxyFactory`](crate::ProxyFactory) creates.
///
/// Missing fields take their defaults when deserializing, so `{}` is a valid config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Maximum nested dispatch depth per thread. `None` disables the check.
    pub max_dispatch_depth: Option<usize>,
    /// Whether synthesized proxy types mirror legacy protocol variants
    /// (`__nonzero__`, `__cmp__`, `__div__`, ...) found on the wrapped class.
    pub mirror_legacy: bool,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            max_dispatch_depth: Some(DEFAULT_MAX_DISPATCH_DEPTH),
            mirror_legacy: true,
        }
    }
}

impl ProxyConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum dispatch depth.
    #[must_use]
    pub fn max_dispatch_depth(mut self, limit: Option<usize>) -> Self {
        self.max_dispatch_depth = limit;
        self
    }

    /// Sets whether legacy protocol variants are mirrored.
    #[must_use]
    pub fn mirror_legacy(mut self, mirror: bool) -> Self {
        self.mirror_legacy = mirror;
        self
    }

    /// Parses a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(ConfigError)
    }

    /// Serializes the configuration to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(ConfigError)
    }
}

/// A configuration that could not be parsed or serialized.
#[derive(Debug)]
pub struct ConfigError(serde_json::Error);

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid proxy config: {}", self.0)
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}
