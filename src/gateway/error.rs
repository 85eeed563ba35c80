//! Model gateway failures.

use crate::cache::Fingerprint;
use crate::provider::ProviderError;
use thiserror::Error;

/// Why the gateway produced no text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Daily budget exhausted; the caller answers with a "try later" template.
    #[error("Daily model quota exhausted ({remaining} remaining)")]
    QuotaExceeded { remaining: u32 },

    /// Transport or provider failure; the caller may retry once.
    #[error("Upstream failure: {0}")]
    Upstream(ProviderError),

    /// An identical request is already in flight.
    #[error("Duplicate request {} already in flight", .fingerprint.short())]
    DuplicateSuppressed { fingerprint: Fingerprint },
}

impl GatewayError {
    /// Worth one retry with the same request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GatewayError::Upstream(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_upstream_is_retryable() {
        assert!(GatewayError::Upstream(ProviderError::Timeout(100)).is_retryable());
        assert!(!GatewayError::QuotaExceeded { remaining: 0 }.is_retryable());
        assert!(!GatewayError::DuplicateSuppressed {
            fingerprint: Fingerprint::of("x")
        }
        .is_retryable());
    }

    #[test]
    fn test_duplicate_display_uses_short_fingerprint() {
        let fingerprint = Fingerprint::of("x");
        let message = GatewayError::DuplicateSuppressed {
            fingerprint: fingerprint.clone(),
        }
        .to_string();
        assert!(message.contains(fingerprint.short()));
        assert!(!message.contains(fingerprint.as_str()));
    }
}
