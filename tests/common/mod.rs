//! Shared test utilities for helpdesk integration tests.
//!
//! Provides a scripted text generator and builders that wire an
//! [`Orchestrator`] to a manual clock and an in-memory event sink.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use chrono::NaiveDate;
use futures::StreamExt;
use helpdesk::api::{create_router, AppState};
use helpdesk::config::{HelpdeskConfig, ProviderKind};
use helpdesk::logging::MemorySink;
use helpdesk::provider::{ProviderError, TextGenerator};
use helpdesk::quota::ManualClock;
use helpdesk::router::Orchestrator;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// =============================================================================
// Messages that always take the model path
// =============================================================================

pub const OPEN_QUESTION_A: &str = "write a welcome note for the new chef";
pub const OPEN_QUESTION_B: &str = "draft a short poem about the lobby";
pub const OPEN_QUESTION_C: &str = "summarize the guest feedback from yesterday";

/// Fixed start day for the manual clock.
pub fn start_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 14).unwrap()
}

// =============================================================================
// Scripted generator
// =============================================================================

/// Text generator that replays scripted results, then answers
/// `"answer N"` for call number N.
pub struct ScriptedGenerator {
    script: Mutex<VecDeque<Result<String, ProviderError>>>,
    calls: AtomicUsize,
    delay: Duration,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
        }
    }

    pub fn with_script(results: Vec<Result<String, ProviderError>>) -> Self {
        let generator = Self::new();
        *generator.script.lock().unwrap() = results.into();
        generator
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }

    async fn generate(
        &self,
        _prompt: &str,
        _max_tokens: Option<u32>,
    ) -> Result<String, ProviderError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let scripted = self.script.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| Ok(format!("answer {}", n)))
    }
}

// =============================================================================
// Harness
// =============================================================================

pub struct Harness {
    pub orchestrator: Arc<Orchestrator>,
    pub config: Arc<HelpdeskConfig>,
    pub generator: Arc<ScriptedGenerator>,
    pub clock: Arc<ManualClock>,
    pub sink: Arc<MemorySink>,
}

/// Defaults with the given daily limit; the provider is never built from config.
pub fn test_config(daily_limit: u32) -> HelpdeskConfig {
    let mut config = HelpdeskConfig::default();
    config.quota.daily_limit = daily_limit;
    config.provider.kind = ProviderKind::Offline;
    config
}

pub fn harness(config: HelpdeskConfig, generator: ScriptedGenerator) -> Harness {
    let generator = Arc::new(generator);
    let clock = Arc::new(ManualClock::new(start_day()));
    let sink = Arc::new(MemorySink::new(1024));
    let orchestrator = Orchestrator::builder(config.clone())
        .provider(generator.clone())
        .clock(clock.clone())
        .sink(sink.clone())
        .build()
        .unwrap();

    Harness {
        orchestrator: Arc::new(orchestrator),
        config: Arc::new(config),
        generator,
        clock,
        sink,
    }
}

/// Harness with a generator that always succeeds.
pub fn default_harness(daily_limit: u32) -> Harness {
    harness(test_config(daily_limit), ScriptedGenerator::new())
}

impl Harness {
    pub fn app(&self) -> axum::Router {
        let state = Arc::new(AppState::new(
            self.orchestrator.clone(),
            self.config.clone(),
        ));
        create_router(state)
    }
}

// =============================================================================
// HTTP helpers
// =============================================================================

pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let mut stream = response.into_body().into_data_stream();
    let mut bytes = Vec::new();
    while let Some(chunk) = stream.next().await {
        bytes.extend_from_slice(&chunk.unwrap());
    }
    serde_json::from_slice(&bytes).unwrap()
}
