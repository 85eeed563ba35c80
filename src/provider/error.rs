//! Error types for provider calls.

use thiserror::Error;

/// Errors from a single text-generation call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Network connectivity error (DNS, connection refused, etc.).
    #[error("Network error: {0}")]
    Network(String),

    /// Request exceeded deadline.
    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    /// Provider returned an error response (4xx, 5xx).
    #[error("Provider error {status}: {message}")]
    Upstream { status: u16, message: String },

    /// Provider reported quota exhaustion or rate limiting.
    #[error("Rate limited by provider: {0}")]
    RateLimited(String),

    /// API key rejected.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Response doesn't match the expected format.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Provider not usable with the current configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ProviderError {
    /// Short stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::Network(_) => "network",
            ProviderError::Timeout(_) => "timeout",
            ProviderError::Upstream { .. } => "upstream",
            ProviderError::RateLimited(_) => "rate_limited",
            ProviderError::Unauthorized(_) => "unauthorized",
            ProviderError::InvalidResponse(_) => "invalid_response",
            ProviderError::Configuration(_) => "configuration",
        }
    }
}
