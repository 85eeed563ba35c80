//! Google Generative Language API provider.

use super::{ProviderError, TextGenerator};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Gemini `generateContent` over HTTPS.
///
/// - POST /v1beta/models/{model}:generateContent?key={key}
/// - HTTP 429, or a 4xx body mentioning quota, maps to `RateLimited`
/// - 401/403 map to `Unauthorized`, other failures to `Upstream`
pub struct GeminiProvider {
    /// Base URL (e.g., "https://generativelanguage.googleapis.com")
    base_url: String,
    model: String,
    api_key: String,
    timeout: Duration,
    client: Client,
}

impl GeminiProvider {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
        client: Client,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.into(),
            timeout,
            client,
        }
    }

    fn build_request(prompt: &str, max_tokens: Option<u32>) -> GeminiRequest {
        GeminiRequest {
            contents: vec![GeminiContent {
                role: "user".to_string(),
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: max_tokens.map(|max| GeminiGenerationConfig {
                max_output_tokens: Some(max),
            }),
        }
    }

    fn extract_text(response: GeminiResponse) -> Result<String, ProviderError> {
        let candidate = response.candidates.into_iter().next().ok_or_else(|| {
            ProviderError::InvalidResponse("response contained no candidates".to_string())
        })?;
        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();
        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(ProviderError::InvalidResponse(format!(
                "empty candidate (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            )));
        }
        Ok(text)
    }

    fn map_status(status: StatusCode, body: String) -> ProviderError {
        if status == StatusCode::TOO_MANY_REQUESTS
            || (status.is_client_error() && body.to_lowercase().contains("quota"))
        {
            ProviderError::RateLimited(body)
        } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            ProviderError::Unauthorized(body)
        } else {
            ProviderError::Upstream {
                status: status.as_u16(),
                message: body,
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "generationConfig")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    role: String,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[async_trait]
impl TextGenerator for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str, max_tokens: Option<u32>) -> Result<String, ProviderError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );
        let timeout_ms = self.timeout.as_millis() as u64;

        tracing::debug!(
            provider = "gemini",
            model = %self.model,
            prompt_chars = prompt.chars().count(),
            "initiating generation"
        );

        let start = std::time::Instant::now();
        let response = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .json(&Self::build_request(prompt, max_tokens))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(timeout_ms)
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::info!(
                provider = "gemini",
                model = %self.model,
                status = %status,
                latency_ms = start.elapsed().as_millis(),
                "generation failed"
            );
            return Err(Self::map_status(status, error_body));
        }

        let body: GeminiResponse = response.json().await.map_err(|e| {
            ProviderError::InvalidResponse(format!("Failed to parse Gemini response: {}", e))
        })?;

        let text = Self::extract_text(body)?;
        tracing::info!(
            provider = "gemini",
            model = %self.model,
            latency_ms = start.elapsed().as_millis(),
            response_chars = text.chars().count(),
            "generation succeeded"
        );
        Ok(text)
    }
}
