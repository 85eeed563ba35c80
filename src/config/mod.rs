//! Configuration module for the helpdesk router
//!
//! Provides layered configuration loading from files, environment variables, and defaults.
//!
//! # Configuration Precedence
//!
//! 1. CLI arguments (highest priority)
//! 2. Environment variables (`HELPDESK_*`)
//! 3. Configuration file (TOML)
//! 4. Default values (lowest priority)
//!
//! # Example
//!
//! ```rust
//! use helpdesk::config::HelpdeskConfig;
//!
//! let config = HelpdeskConfig::default();
//! assert_eq!(config.quota.daily_limit, 50);
//!
//! let toml = r#"
//! [quota]
//! daily_limit = 10
//! "#;
//! let config: HelpdeskConfig = toml::from_str(toml).unwrap();
//! assert_eq!(config.quota.daily_limit, 10);
//! assert_eq!(config.cache.capacity, 100);
//! ```

pub mod cache;
pub mod context;
pub mod error;
pub mod logging;
pub mod provider;
pub mod quota;
pub mod server;

pub use cache::CacheConfig;
pub use context::{ContextConfig, MAX_CONTEXT_TURNS};
pub use error::ConfigError;
pub use logging::{LogFormat, LoggingConfig};
pub use provider::{ProviderConfig, ProviderKind};
pub use quota::QuotaConfig;
pub use server::ServerConfig;

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Unified configuration for the helpdesk router.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct HelpdeskConfig {
    /// HTTP surface
    pub server: ServerConfig,
    /// Daily model-call budget
    pub quota: QuotaConfig,
    /// Response cache sizing
    pub cache: CacheConfig,
    /// Conversation context carried into model calls
    pub context: ContextConfig,
    /// Language model provider
    pub provider: ProviderConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl HelpdeskConfig {
    /// Load configuration from a TOML file
    ///
    /// If path is None, returns default configuration.
    /// If path doesn't exist, returns NotFound error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => {
                if !p.exists() {
                    return Err(ConfigError::NotFound(p.to_path_buf()));
                }
                let content = std::fs::read_to_string(p)?;
                toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
            }
            None => Ok(Self::default()),
        }
    }

    /// Apply `HELPDESK_*` environment variable overrides.
    ///
    /// Invalid values are ignored (defaults are kept).
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(limit) = env_parse("HELPDESK_DAILY_LIMIT") {
            self.quota.daily_limit = limit;
        }
        if let Some(capacity) = env_parse("HELPDESK_CACHE_CAPACITY") {
            self.cache.capacity = capacity;
        }
        if let Ok(model) = std::env::var("HELPDESK_MODEL") {
            self.provider.model = model;
        }

        if let Some(port) = env_parse("HELPDESK_PORT") {
            self.server.port = port;
        }
        if let Ok(host) = std::env::var("HELPDESK_HOST") {
            self.server.host = host;
        }

        if let Ok(level) = std::env::var("HELPDESK_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = env_parse("HELPDESK_LOG_FORMAT") {
            self.logging.format = format;
        }

        self
    }

    /// Validate every section
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::invalid("server.port", "port must be non-zero"));
        }
        self.quota.validate()?;
        self.cache.validate()?;
        self.context.validate()?;
        self.provider.validate()?;
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}
