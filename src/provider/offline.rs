//! Provider used when no model is reachable.

use super::{ProviderError, TextGenerator};
use async_trait::async_trait;

/// Always fails with [`ProviderError::Configuration`].
///
/// Pattern-first paths keep working; delegated turns fall back to the
/// apology template.
#[derive(Debug, Clone)]
pub struct OfflineProvider {
    reason: String,
}

impl OfflineProvider {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl Default for OfflineProvider {
    fn default() -> Self {
        Self::new("model provider disabled")
    }
}

#[async_trait]
impl TextGenerator for OfflineProvider {
    fn name(&self) -> &str {
        "offline"
    }

    fn model(&self) -> &str {
        "none"
    }

    async fn generate(&self, _prompt: &str, _max_tokens: Option<u32>) -> Result<String, ProviderError> {
        Err(ProviderError::Configuration(self.reason.clone()))
    }
}
