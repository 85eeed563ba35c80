//! Request and response bodies.

use crate::gateway::GatewayStatsSnapshot;
use crate::intent::{DecisionReason, RoutePath};
use crate::quota::{QuotaHealth, QuotaSnapshot};
use crate::router::{Fallback, TurnOutcome};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Maximum accepted message length in characters.
pub const MAX_MESSAGE_CHARS: usize = 4000;

/// POST /v1/chat body.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatRequest {
    /// Omit to start a new session
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub message: String,
}

/// POST /v1/chat response.
#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub session_id: String,
    pub response: String,
    pub path: RoutePath,
    pub reason: DecisionReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<Fallback>,
    pub cached: bool,
    pub quota: QuotaSnapshot,
}

impl From<TurnOutcome> for ChatResponse {
    fn from(outcome: TurnOutcome) -> Self {
        Self {
            path: outcome.path(),
            reason: outcome.reason(),
            session_id: outcome.session_id,
            response: outcome.response,
            fallback: outcome.fallback,
            cached: outcome.cached,
            quota: outcome.quota,
        }
    }
}

/// GET /v1/stats response.
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub provider: String,
    pub sessions: usize,
    pub cache_entries: usize,
    pub gateway: GatewayStatsSnapshot,
    pub quota: QuotaSnapshot,
}

/// GET /health response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_seconds: u64,
    pub provider: String,
    pub quota_health: QuotaHealth,
    pub quota_remaining: u32,
}

/// Error envelope.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiError {
    pub error: ApiErrorBody,
}

/// Error details.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiErrorBody {
    pub message: String,
    pub r#type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub param: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ApiError {
    /// Create a bad request error (400).
    pub fn bad_request(message: &str, param: Option<&str>) -> Self {
        Self {
            error: ApiErrorBody {
                message: message.to_string(),
                r#type: "invalid_request_error".to_string(),
                param: param.map(str::to_string),
                code: Some("invalid_request_error".to_string()),
            },
        }
    }

    /// Create a session not found error (404).
    pub fn session_not_found(session_id: &str) -> Self {
        Self {
            error: ApiErrorBody {
                message: format!("Session '{}' not found", session_id),
                r#type: "invalid_request_error".to_string(),
                param: Some("id".to_string()),
                code: Some("session_not_found".to_string()),
            },
        }
    }

    /// Get the HTTP status code for this error.
    fn status_code(&self) -> StatusCode {
        match self.error.code.as_deref() {
            Some("invalid_request_error") => StatusCode::BAD_REQUEST,
            Some("session_not_found") => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chat_request_session_optional() {
        let request: ChatRequest = serde_json::from_value(json!({"message": "hi"})).unwrap();
        assert_eq!(request.session_id, None);
        assert_eq!(request.message, "hi");
    }

    #[test]
    fn test_api_error_serialization() {
        let error = ApiError::bad_request("message must not be empty", Some("message"));
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["error"]["type"], "invalid_request_error");
        assert_eq!(json["error"]["param"], "message");
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_not_found_status() {
        let error = ApiError::session_not_found("abc");
        assert_eq!(error.status_code(), StatusCode::NOT_FOUND);
        assert!(error.error.message.contains("abc"));
    }
}
