//! Telemetry events emitted by the router and the model gateway.

use crate::intent::{DecisionReason, RoutePath};
use crate::router::Fallback;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// One routing decision, emitted once per handled turn.
#[derive(Debug, Clone, Serialize)]
pub struct RoutingEvent {
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
    pub component: &'static str,
    pub path: RoutePath,
    pub reason: DecisionReason,
    pub quota_remaining: u32,
    /// The model path was answered from the response cache
    pub cache_hit: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<Fallback>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}

/// Result of a single gateway attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayOutcome {
    CacheHit,
    Success,
    Failure,
    Refused,
    Duplicate,
}

impl GatewayOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            GatewayOutcome::CacheHit => "cache_hit",
            GatewayOutcome::Success => "success",
            GatewayOutcome::Failure => "failure",
            GatewayOutcome::Refused => "refused",
            GatewayOutcome::Duplicate => "duplicate",
        }
    }
}

impl std::fmt::Display for GatewayOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One model-gateway attempt, emitted for every call to `complete`.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayEvent {
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
    pub component: &'static str,
    pub path: RoutePath,
    /// Short fingerprint prefix
    pub fingerprint: String,
    pub outcome: GatewayOutcome,
    pub quota_remaining: u32,
    pub cache_hit: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TelemetryEvent {
    Routing(RoutingEvent),
    Gateway(GatewayEvent),
}

/// Destination for telemetry events. The core owns no log storage.
pub trait EventSink: Send + Sync {
    fn record(&self, event: &TelemetryEvent);
}

/// Default sink: structured `tracing` output plus `metrics` counters.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&self, event: &TelemetryEvent) {
        match event {
            TelemetryEvent::Routing(e) => {
                tracing::info!(
                    target: "helpdesk::events",
                    component = e.component,
                    session_id = %e.session_id,
                    path = %e.path,
                    reason = %e.reason,
                    quota_remaining = e.quota_remaining,
                    cache_hit = e.cache_hit,
                    fallback = ?e.fallback,
                    preview = e.preview.as_deref().unwrap_or(""),
                    "routing decision"
                );
                metrics::counter!("helpdesk_routing_decisions_total", "path" => e.path.as_str())
                    .increment(1);
            }
            TelemetryEvent::Gateway(e) => {
                match e.outcome {
                    GatewayOutcome::Failure | GatewayOutcome::Refused => tracing::warn!(
                        target: "helpdesk::events",
                        component = e.component,
                        session_id = %e.session_id,
                        fingerprint = %e.fingerprint,
                        outcome = %e.outcome,
                        quota_remaining = e.quota_remaining,
                        error = e.error.as_deref().unwrap_or(""),
                        "gateway attempt"
                    ),
                    _ => tracing::info!(
                        target: "helpdesk::events",
                        component = e.component,
                        session_id = %e.session_id,
                        fingerprint = %e.fingerprint,
                        outcome = %e.outcome,
                        quota_remaining = e.quota_remaining,
                        cache_hit = e.cache_hit,
                        latency_ms = e.latency_ms.unwrap_or(0),
                        "gateway attempt"
                    ),
                }
                metrics::counter!(
                    "helpdesk_gateway_attempts_total",
                    "outcome" => e.outcome.as_str()
                )
                .increment(1);
            }
        }
    }
}

/// Bounded in-memory sink keeping the most recent events.
#[derive(Debug)]
pub struct MemorySink {
    capacity: usize,
    events: Mutex<VecDeque<TelemetryEvent>>,
}

impl MemorySink {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            events: Mutex::new(VecDeque::with_capacity(capacity.max(1))),
        }
    }

    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.lock().iter().cloned().collect()
    }

    pub fn routing_events(&self) -> Vec<RoutingEvent> {
        self.lock()
            .iter()
            .filter_map(|e| match e {
                TelemetryEvent::Routing(r) => Some(r.clone()),
                TelemetryEvent::Gateway(_) => None,
            })
            .collect()
    }

    pub fn gateway_events(&self) -> Vec<GatewayEvent> {
        self.lock()
            .iter()
            .filter_map(|e| match e {
                TelemetryEvent::Gateway(g) => Some(g.clone()),
                TelemetryEvent::Routing(_) => None,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<TelemetryEvent>> {
        self.events.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EventSink for MemorySink {
    fn record(&self, event: &TelemetryEvent) {
        let mut events = self.lock();
        if events.len() == self.capacity {
            events.pop_front();
        }
        events.push_back(event.clone());
    }
}

/// Forwards every event to each inner sink in order.
#[derive(Default, Clone)]
pub struct MultiSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl MultiSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl EventSink for MultiSink {
    fn record(&self, event: &TelemetryEvent) {
        for sink in &self.sinks {
            sink.record(event);
        }
    }
}
