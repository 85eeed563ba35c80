//! Chat turn and session endpoints.

use crate::api::{ApiError, AppState, ChatRequest, ChatResponse, MAX_MESSAGE_CHARS};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

/// POST /v1/chat - Handle one user turn.
pub async fn handle(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if request.message.trim().is_empty() {
        return Err(ApiError::bad_request(
            "message must not be empty",
            Some("message"),
        ));
    }
    if request.message.chars().count() > MAX_MESSAGE_CHARS {
        return Err(ApiError::bad_request(
            &format!("message exceeds {} characters", MAX_MESSAGE_CHARS),
            Some("message"),
        ));
    }

    let session_id = match request.session_id {
        Some(id) if !id.trim().is_empty() => id,
        _ => Uuid::new_v4().to_string(),
    };

    let outcome = state
        .orchestrator
        .handle_message(&session_id, &request.message)
        .await;
    Ok(Json(ChatResponse::from(outcome)))
}

/// DELETE /v1/sessions/:id - End a session.
pub async fn end_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.orchestrator.end_session(&id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::session_not_found(&id))
    }
}
