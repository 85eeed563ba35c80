//! Language model providers.
//!
//! [`TextGenerator`] is the single outbound call the routing core makes:
//! `generate(prompt, max_tokens) -> text`. Only the model gateway calls it.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

pub mod error;
pub mod gemini;
pub mod offline;

pub use error::ProviderError;
pub use gemini::GeminiProvider;
pub use offline::OfflineProvider;

use crate::config::{ProviderConfig, ProviderKind};

/// Text generation backend.
///
/// Object-safe; used as `Arc<dyn TextGenerator>`. Dropping the future
/// aborts the in-flight request.
#[async_trait]
pub trait TextGenerator: Send + Sync + 'static {
    /// Provider name for logs (e.g., "gemini").
    fn name(&self) -> &str;

    /// Model identifier; part of the request fingerprint.
    fn model(&self) -> &str;

    /// Generate a completion for `prompt`.
    ///
    /// # Returns
    ///
    /// - `Err(ProviderError::RateLimited)` when the provider reports quota exhaustion
    /// - `Err(ProviderError::Upstream)` for other 4xx/5xx responses
    /// - `Err(ProviderError::Network)` / `Err(ProviderError::Timeout)` for transport failures
    async fn generate(&self, prompt: &str, max_tokens: Option<u32>)
        -> Result<String, ProviderError>;
}

/// Build the configured provider.
///
/// A Gemini provider without an API key degrades to [`OfflineProvider`] so
/// the bot still answers every pattern-first turn.
pub fn from_config(config: &ProviderConfig) -> Result<Arc<dyn TextGenerator>, ProviderError> {
    match config.kind {
        ProviderKind::Offline => Ok(Arc::new(OfflineProvider::default())),
        ProviderKind::Gemini => {
            let Some(api_key) = config.api_key() else {
                tracing::warn!(
                    env = %config.api_key_env,
                    "no API key found, model calls disabled"
                );
                return Ok(Arc::new(OfflineProvider::new(format!(
                    "API key env var '{}' is not set",
                    config.api_key_env
                ))));
            };
            let timeout = Duration::from_secs(config.timeout_seconds);
            let client = reqwest::Client::builder()
                .timeout(timeout)
                .pool_max_idle_per_host(4)
                .build()
                .map_err(|e| ProviderError::Configuration(e.to_string()))?;
            Ok(Arc::new(GeminiProvider::new(
                config.base_url.clone(),
                config.model.clone(),
                api_key,
                timeout,
                client,
            )))
        }
    }
}
