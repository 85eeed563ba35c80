//! Daily quota configuration

use super::ConfigError;
use serde::{Deserialize, Serialize};

/// Daily budget for outbound model calls.
///
/// Health thresholds are percentages of `daily_limit` so that the UI bands
/// scale with the configured budget. With the default limit of 50 they give
/// `> 20` remaining = healthy, `10..=20` = warning, `< 10` = critical.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuotaConfig {
    /// Maximum granted model calls per calendar day
    pub daily_limit: u32,

    /// Remaining share (0-100) at or below which status turns to warning
    pub warning_percent: u8,

    /// Remaining share (0-100) below which status turns to critical
    pub critical_percent: u8,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            daily_limit: 50,
            warning_percent: 40,
            critical_percent: 20,
        }
    }
}

impl QuotaConfig {
    /// Validate configuration at startup
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.daily_limit == 0 {
            return Err(ConfigError::invalid(
                "quota.daily_limit",
                "daily_limit must be a positive integer",
            ));
        }
        if self.warning_percent > 100 {
            return Err(ConfigError::invalid(
                "quota.warning_percent",
                "warning_percent must be 0-100",
            ));
        }
        if self.critical_percent >= self.warning_percent {
            return Err(ConfigError::invalid(
                "quota.critical_percent",
                "critical_percent must be below warning_percent",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_config_defaults() {
        let config = QuotaConfig::default();
        assert_eq!(config.daily_limit, 50);
        assert_eq!(config.warning_percent, 40);
        assert_eq!(config.critical_percent, 20);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_quota_config_zero_limit_rejected() {
        let config = QuotaConfig {
            daily_limit: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation { ref field, .. }) if field == "quota.daily_limit"
        ));
    }

    #[test]
    fn test_quota_config_threshold_order() {
        let config = QuotaConfig {
            warning_percent: 20,
            critical_percent: 30,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = QuotaConfig {
            warning_percent: 101,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_quota_config_partial_toml() {
        let config: QuotaConfig = toml::from_str("daily_limit = 5").unwrap();
        assert_eq!(config.daily_limit, 5);
        assert_eq!(config.warning_percent, 40);
    }
}
