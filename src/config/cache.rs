//! Response cache configuration

use super::ConfigError;
use serde::{Deserialize, Serialize};

/// Response cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of cached responses (LRU eviction beyond this)
    pub capacity: usize,

    /// Drop all cached responses when the quota day rolls over.
    /// Setting this to false decouples cache lifetime from the quota day.
    pub clear_on_rollover: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 100,
            clear_on_rollover: true,
        }
    }
}

impl CacheConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::invalid(
                "cache.capacity",
                "capacity must be a positive integer",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_config_defaults() {
        let config = CacheConfig::default();
        assert_eq!(config.capacity, 100);
        assert!(config.clear_on_rollover);
    }

    #[test]
    fn test_cache_config_zero_capacity() {
        let config = CacheConfig {
            capacity: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
