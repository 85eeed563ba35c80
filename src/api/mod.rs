//! # HTTP API
//!
//! JSON endpoints in front of the routing core.
//!
//! ## Endpoints
//!
//! - `POST /v1/chat` - Handle one turn (`{session_id?, message}`)
//! - `DELETE /v1/sessions/:id` - End a session
//! - `GET /v1/quota` - Today's model-call budget
//! - `GET /v1/stats` - Gateway counters and session count
//! - `GET /health` - Liveness with uptime and quota health
//!
//! ## Example
//!
//! ```no_run
//! use helpdesk::api::{create_router, AppState};
//! use helpdesk::config::HelpdeskConfig;
//! use helpdesk::router::Orchestrator;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Arc::new(HelpdeskConfig::default());
//! let orchestrator = Arc::new(Orchestrator::builder((*config).clone()).build()?);
//! let app = create_router(Arc::new(AppState::new(orchestrator, config)));
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Errors
//!
//! Errors use one envelope:
//! ```json
//! {
//!   "error": {
//!     "message": "message must not be empty",
//!     "type": "invalid_request_error",
//!     "param": "message",
//!     "code": "invalid_request_error"
//!   }
//! }
//! ```
//!
//! A turn never fails because of the model: quota exhaustion and upstream
//! failures come back as `200` with a template response and `fallback` set.

mod chat;
mod health;
mod status;
pub mod types;

pub use types::*;

use crate::config::HelpdeskConfig;
use crate::router::Orchestrator;
use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use std::time::Instant;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Maximum request body size (64 KB).
const MAX_BODY_SIZE: usize = 64 * 1024;

/// Shared application state accessible to all handlers.
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub config: Arc<HelpdeskConfig>,
    /// Server startup time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>, config: Arc<HelpdeskConfig>) -> Self {
        Self {
            orchestrator,
            config,
            start_time: Instant::now(),
        }
    }
}

/// Create the API router with all endpoints configured.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/chat", post(chat::handle))
        .route("/v1/sessions/:id", delete(chat::end_session))
        .route("/v1/quota", get(status::quota))
        .route("/v1/stats", get(status::stats))
        .route("/health", get(health::handle))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
