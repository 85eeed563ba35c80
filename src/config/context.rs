//! Short-context configuration for model requests

use super::ConfigError;
use serde::{Deserialize, Serialize};

/// Hard ceiling on remembered exchanges per session.
pub const MAX_CONTEXT_TURNS: usize = 2;

/// How much conversation history is carried into a model request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Number of recent exchanges kept per session (1-2)
    pub max_turns: usize,

    /// Character budget applied to each side of each carried exchange
    pub turn_char_budget: usize,

    /// Sessions idle for longer than this are dropped
    pub idle_timeout_seconds: u64,

    /// Upper bound on live sessions; the least recently active go first
    pub max_sessions: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_turns: MAX_CONTEXT_TURNS,
            turn_char_budget: 160,
            idle_timeout_seconds: 1800,
            max_sessions: 10_000,
        }
    }
}

impl ContextConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_CONTEXT_TURNS).contains(&self.max_turns) {
            return Err(ConfigError::invalid(
                "context.max_turns",
                format!("max_turns must be 1-{}", MAX_CONTEXT_TURNS),
            ));
        }
        if self.turn_char_budget == 0 {
            return Err(ConfigError::invalid(
                "context.turn_char_budget",
                "turn_char_budget must be a positive integer",
            ));
        }
        if self.idle_timeout_seconds == 0 {
            return Err(ConfigError::invalid(
                "context.idle_timeout_seconds",
                "idle_timeout_seconds must be a positive integer",
            ));
        }
        if self.max_sessions == 0 {
            return Err(ConfigError::invalid(
                "context.max_sessions",
                "max_sessions must be a positive integer",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_config_defaults() {
        let config = ContextConfig::default();
        assert_eq!(config.max_turns, 2);
        assert_eq!(config.turn_char_budget, 160);
        assert_eq!(config.idle_timeout_seconds, 1800);
        assert_eq!(config.max_sessions, 10_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_context_config_turn_bounds() {
        for turns in [0, 3] {
            let config = ContextConfig {
                max_turns: turns,
                ..Default::default()
            };
            assert!(config.validate().is_err(), "max_turns={} accepted", turns);
        }
    }

    #[test]
    fn test_context_config_session_limits_positive() {
        let config = ContextConfig {
            idle_timeout_seconds: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        let config = ContextConfig {
            max_sessions: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
