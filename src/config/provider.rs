//! Language model provider configuration

use super::ConfigError;
use serde::{Deserialize, Serialize};

/// Provider implementation to use for model-gateway calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Google Generative Language API
    #[default]
    Gemini,
    /// No outbound calls; every delegated turn falls back to a template
    Offline,
}

/// Provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub base_url: String,
    pub model: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    /// Upper bound on a single outbound call
    pub timeout_seconds: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::Gemini,
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-2.0-flash-exp".to_string(),
            api_key_env: "GEN_API_KEY".to_string(),
            timeout_seconds: 30,
            max_output_tokens: Some(512),
        }
    }
}

impl ProviderConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_seconds == 0 {
            return Err(ConfigError::invalid(
                "provider.timeout_seconds",
                "timeout must be non-zero",
            ));
        }
        if self.kind == ProviderKind::Gemini {
            if self.base_url.is_empty() {
                return Err(ConfigError::invalid(
                    "provider.base_url",
                    "URL cannot be empty",
                ));
            }
            if self.model.is_empty() {
                return Err(ConfigError::invalid(
                    "provider.model",
                    "model cannot be empty",
                ));
            }
        }
        Ok(())
    }

    /// Read the API key from the configured environment variable.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}
