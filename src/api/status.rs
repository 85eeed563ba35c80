//! Quota and statistics endpoints.

use crate::api::{AppState, StatsResponse};
use crate::quota::QuotaSnapshot;
use axum::{extract::State, Json};
use std::sync::Arc;

/// GET /v1/quota - Today's model-call budget.
pub async fn quota(State(state): State<Arc<AppState>>) -> Json<QuotaSnapshot> {
    Json(state.orchestrator.quota_snapshot())
}

/// GET /v1/stats - Gateway counters and session count.
pub async fn stats(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    let orchestrator = &state.orchestrator;
    Json(StatsResponse {
        provider: orchestrator.provider_name().to_string(),
        sessions: orchestrator.session_count(),
        cache_entries: orchestrator.cache_len(),
        gateway: orchestrator.gateway_stats(),
        quota: orchestrator.quota_snapshot(),
    })
}
