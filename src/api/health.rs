//! Health check endpoint handler.

use crate::api::{AppState, HealthResponse};
use crate::quota::QuotaHealth;
use axum::{extract::State, Json};
use std::sync::Arc;

/// GET /health - Liveness plus quota health.
///
/// `degraded` when the day's budget is gone or no provider is configured;
/// pattern-first turns keep working either way.
pub async fn handle(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let quota = state.orchestrator.quota_snapshot();
    let provider = state.orchestrator.provider_name().to_string();

    let status = if quota.remaining == 0 || provider == "offline" {
        "degraded"
    } else {
        "healthy"
    };

    Json(HealthResponse {
        status: status.to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        provider,
        quota_health: quota.health,
        quota_remaining: quota.remaining,
    })
}
