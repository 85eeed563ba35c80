//! Model gateway: the only path to the language model.
//!
//! Every outbound call goes through [`ModelGateway::complete`], which
//!
//! 1. normalizes the request and fingerprints it,
//! 2. answers from the response cache when possible (no quota used),
//! 3. suppresses a duplicate of a request already in flight,
//! 4. reserves quota, refusing with `QuotaExceeded` when exhausted,
//! 5. calls the provider under a bounded timeout,
//! 6. caches a successful response.
//!
//! One telemetry event is recorded per attempt.

pub mod error;

pub use error::GatewayError;

use crate::cache::{Fingerprint, ResponseCache};
use crate::intent::{ReducedContext, RoutePath};
use crate::logging::{EventSink, GatewayEvent, GatewayOutcome, TelemetryEvent};
use crate::provider::{ProviderError, TextGenerator};
use crate::quota::QuotaTracker;
use chrono::Utc;
use dashmap::DashSet;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

const DEFAULT_PREAMBLE: &str = "You are the hotel operations help desk assistant. \
You help staff with user accounts, service requests, work orders and troubleshooting. \
Answer briefly and concretely. If you are unsure, say so and suggest contacting the front office.";

/// The parts a delegated prompt is assembled from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPieces {
    pub preamble: String,
    pub context: ReducedContext,
    pub message: String,
}

impl PromptPieces {
    pub fn new(message: impl Into<String>, context: ReducedContext) -> Self {
        Self {
            preamble: DEFAULT_PREAMBLE.to_string(),
            context,
            message: message.into(),
        }
    }

    pub fn with_preamble(mut self, preamble: impl Into<String>) -> Self {
        self.preamble = preamble.into();
        self
    }

    /// Prompt text with whitespace runs collapsed in every piece.
    pub fn render(&self) -> String {
        let mut prompt = collapse_whitespace(&self.preamble);
        if !self.context.is_empty() {
            prompt.push_str("\n\nConversation so far:");
            for turn in &self.context.turns {
                prompt.push_str("\nUser: ");
                prompt.push_str(&collapse_whitespace(&turn.user));
                prompt.push_str("\nAssistant: ");
                prompt.push_str(&collapse_whitespace(&turn.assistant));
            }
        }
        prompt.push_str("\n\nUser: ");
        prompt.push_str(&collapse_whitespace(&self.message));
        prompt.push_str("\nAssistant:");
        prompt
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Exact outbound request; its fingerprint is the cache key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRequest {
    pub model: String,
    pub max_tokens: Option<u32>,
    pub prompt: String,
}

impl NormalizedRequest {
    pub fn fingerprint(&self) -> Fingerprint {
        let max_tokens = self.max_tokens.map(|m| m.to_string()).unwrap_or_default();
        Fingerprint::of(&format!(
            "{}\u{1f}{}\u{1f}{}",
            self.model, max_tokens, self.prompt
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionSource {
    Cache,
    Provider,
}

/// Text produced by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub source: CompletionSource,
    pub fingerprint: Fingerprint,
}

#[derive(Debug, Default)]
struct GatewayStats {
    cache_hits: AtomicU64,
    upstream_calls: AtomicU64,
    upstream_failures: AtomicU64,
    rate_limited: AtomicU64,
    refused: AtomicU64,
    duplicates: AtomicU64,
}

/// Gateway counters since startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GatewayStatsSnapshot {
    pub cache_hits: u64,
    pub upstream_calls: u64,
    pub upstream_failures: u64,
    pub rate_limited: u64,
    pub refused: u64,
    pub duplicates: u64,
}

/// Removes the fingerprint from the in-flight set on drop.
struct InFlightGuard<'a> {
    set: &'a DashSet<Fingerprint>,
    fingerprint: Fingerprint,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(set: &'a DashSet<Fingerprint>, fingerprint: &Fingerprint) -> Option<Self> {
        set.insert(fingerprint.clone()).then(|| Self {
            set,
            fingerprint: fingerprint.clone(),
        })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.set.remove(&self.fingerprint);
    }
}

/// Sole chokepoint for language model calls.
pub struct ModelGateway {
    provider: Arc<dyn TextGenerator>,
    quota: Arc<QuotaTracker>,
    cache: Arc<ResponseCache>,
    sink: Arc<dyn EventSink>,
    in_flight: DashSet<Fingerprint>,
    timeout: Duration,
    max_tokens: Option<u32>,
    clear_cache_on_rollover: bool,
    stats: GatewayStats,
}

impl ModelGateway {
    pub fn new(
        provider: Arc<dyn TextGenerator>,
        quota: Arc<QuotaTracker>,
        cache: Arc<ResponseCache>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            provider,
            quota,
            cache,
            sink,
            in_flight: DashSet::new(),
            timeout: Duration::from_secs(30),
            max_tokens: Some(512),
            clear_cache_on_rollover: true,
            stats: GatewayStats::default(),
        }
    }

    /// Upper bound on one provider call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Whether the cache is cleared when the quota day rolls over.
    pub fn with_cache_rollover(mut self, clear: bool) -> Self {
        self.clear_cache_on_rollover = clear;
        self
    }

    pub fn quota(&self) -> &Arc<QuotaTracker> {
        &self.quota
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn normalize(&self, pieces: &PromptPieces) -> NormalizedRequest {
        NormalizedRequest {
            model: self.provider.model().to_string(),
            max_tokens: self.max_tokens,
            prompt: pieces.render(),
        }
    }

    /// Produce text for `pieces`, from the cache or the provider.
    pub async fn complete(
        &self,
        pieces: &PromptPieces,
        session_id: &str,
    ) -> Result<Completion, GatewayError> {
        let request = self.normalize(pieces);
        let fingerprint = request.fingerprint();

        let day = self.quota.current_day();
        if self.clear_cache_on_rollover {
            self.cache.sync_day(day);
        }

        if let Some(text) = self.cache.get(&fingerprint) {
            return Ok(self.cache_hit(text, fingerprint, session_id));
        }

        let Some(_guard) = InFlightGuard::acquire(&self.in_flight, &fingerprint) else {
            self.stats.duplicates.fetch_add(1, Ordering::Relaxed);
            self.record(session_id, &fingerprint, GatewayOutcome::Duplicate, None, None);
            return Err(GatewayError::DuplicateSuppressed { fingerprint });
        };

        // The previous holder may have filled the cache before we got here.
        if let Some(text) = self.cache.get(&fingerprint) {
            return Ok(self.cache_hit(text, fingerprint, session_id));
        }

        let reservation = self.quota.try_reserve();
        if !reservation.granted {
            self.stats.refused.fetch_add(1, Ordering::Relaxed);
            self.record(
                session_id,
                &fingerprint,
                GatewayOutcome::Refused,
                None,
                Some("daily quota exhausted".to_string()),
            );
            return Err(GatewayError::QuotaExceeded {
                remaining: reservation.remaining,
            });
        }

        self.stats.upstream_calls.fetch_add(1, Ordering::Relaxed);
        let start = Instant::now();
        let result = match tokio::time::timeout(
            self.timeout,
            self.provider.generate(&request.prompt, request.max_tokens),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(self.timeout.as_millis() as u64)),
        };
        let latency_ms = Some(start.elapsed().as_millis() as u64);

        match result {
            Ok(text) => {
                self.cache.put(fingerprint.clone(), text.clone());
                self.record(session_id, &fingerprint, GatewayOutcome::Success, latency_ms, None);
                Ok(Completion {
                    text,
                    source: CompletionSource::Provider,
                    fingerprint,
                })
            }
            Err(ProviderError::RateLimited(message)) => {
                self.stats.rate_limited.fetch_add(1, Ordering::Relaxed);
                self.quota.trip();
                self.record(
                    session_id,
                    &fingerprint,
                    GatewayOutcome::Refused,
                    latency_ms,
                    Some(format!("provider rate limit: {}", message)),
                );
                Err(GatewayError::QuotaExceeded { remaining: 0 })
            }
            Err(e) => {
                self.stats.upstream_failures.fetch_add(1, Ordering::Relaxed);
                self.record(
                    session_id,
                    &fingerprint,
                    GatewayOutcome::Failure,
                    latency_ms,
                    Some(e.to_string()),
                );
                Err(GatewayError::Upstream(e))
            }
        }
    }

    pub fn stats(&self) -> GatewayStatsSnapshot {
        GatewayStatsSnapshot {
            cache_hits: self.stats.cache_hits.load(Ordering::Relaxed),
            upstream_calls: self.stats.upstream_calls.load(Ordering::Relaxed),
            upstream_failures: self.stats.upstream_failures.load(Ordering::Relaxed),
            rate_limited: self.stats.rate_limited.load(Ordering::Relaxed),
            refused: self.stats.refused.load(Ordering::Relaxed),
            duplicates: self.stats.duplicates.load(Ordering::Relaxed),
        }
    }

    fn cache_hit(&self, text: String, fingerprint: Fingerprint, session_id: &str) -> Completion {
        self.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
        self.record(session_id, &fingerprint, GatewayOutcome::CacheHit, None, None);
        Completion {
            text,
            source: CompletionSource::Cache,
            fingerprint,
        }
    }

    fn record(
        &self,
        session_id: &str,
        fingerprint: &Fingerprint,
        outcome: GatewayOutcome,
        latency_ms: Option<u64>,
        error: Option<String>,
    ) {
        self.sink.record(&TelemetryEvent::Gateway(GatewayEvent {
            timestamp: Utc::now(),
            session_id: session_id.to_string(),
            component: "gateway",
            path: RoutePath::ModelGateway,
            fingerprint: fingerprint.short().to_string(),
            outcome,
            quota_remaining: self.quota.remaining(),
            cache_hit: outcome == GatewayOutcome::CacheHit,
            latency_ms,
            error,
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QuotaConfig;
    use crate::intent::ContextTurn;
    use crate::logging::MemorySink;
    use crate::quota::ManualClock;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    /// Echoes the prompt's last user line; failures are scripted up front.
    struct Echo {
        calls: AtomicUsize,
        failures: Mutex<Vec<ProviderError>>,
        delay: Duration,
    }

    impl Echo {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                failures: Mutex::new(Vec::new()),
                delay: Duration::ZERO,
            }
        }

        fn failing(errors: Vec<ProviderError>) -> Self {
            let echo = Self::new();
            *echo.failures.lock().unwrap() = errors;
            echo
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TextGenerator for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn model(&self) -> &str {
            "echo-1"
        }

        async fn generate(
            &self,
            prompt: &str,
            _max_tokens: Option<u32>,
        ) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if let Some(err) = self.failures.lock().unwrap().pop() {
                return Err(err);
            }
            let line = prompt
                .lines()
                .rev()
                .find(|l| l.starts_with("User: "))
                .unwrap_or_default();
            Ok(format!("echo {}", line.trim_start_matches("User: ")))
        }
    }

    struct Fixture {
        gateway: ModelGateway,
        provider: Arc<Echo>,
        clock: Arc<ManualClock>,
        sink: Arc<MemorySink>,
    }

    fn fixture(limit: u32, capacity: usize, provider: Echo) -> Fixture {
        let clock = Arc::new(ManualClock::new(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()));
        let quota = Arc::new(QuotaTracker::with_clock(
            QuotaConfig {
                daily_limit: limit,
                ..Default::default()
            },
            clock.clone(),
        ));
        let provider = Arc::new(provider);
        let sink = Arc::new(MemorySink::default());
        let gateway = ModelGateway::new(
            provider.clone(),
            quota,
            Arc::new(ResponseCache::new(capacity)),
            sink.clone(),
        );
        Fixture {
            gateway,
            provider,
            clock,
            sink,
        }
    }

    fn pieces(message: &str) -> PromptPieces {
        PromptPieces::new(message, ReducedContext::default())
    }

    #[tokio::test]
    async fn test_quota_limit_two_scenario() {
        let f = fixture(2, 10, Echo::new());

        let a = f.gateway.complete(&pieces("A"), "s").await.unwrap();
        assert_eq!(f.gateway.quota().remaining(), 1);
        f.gateway.complete(&pieces("B"), "s").await.unwrap();
        assert_eq!(f.gateway.quota().remaining(), 0);

        let c = f.gateway.complete(&pieces("C"), "s").await;
        assert_eq!(c, Err(GatewayError::QuotaExceeded { remaining: 0 }));

        let d = f.gateway.complete(&pieces("A"), "s").await.unwrap();
        assert_eq!(d.source, CompletionSource::Cache);
        assert_eq!(d.text, a.text);
        assert_eq!(f.gateway.quota().remaining(), 0);
        assert_eq!(f.provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_identical_requests_one_call() {
        let f = fixture(10, 10, Echo::new());
        let first = f.gateway.complete(&pieces("same   question"), "s1").await.unwrap();
        let second = f.gateway.complete(&pieces("same question"), "s2").await.unwrap();

        assert_eq!(first.text, second.text);
        assert_eq!(first.fingerprint, second.fingerprint);
        assert_eq!(f.provider.calls(), 1);
        assert_eq!(f.gateway.stats().cache_hits, 1);
    }

    #[tokio::test]
    async fn test_upstream_failure_not_cached_and_retry_succeeds() {
        let f = fixture(10, 10, Echo::failing(vec![ProviderError::Network("reset".into())]));

        let first = f.gateway.complete(&pieces("A"), "s").await;
        assert!(matches!(first, Err(GatewayError::Upstream(ProviderError::Network(_)))));
        let retry = f.gateway.complete(&pieces("A"), "s").await.unwrap();
        assert_eq!(retry.source, CompletionSource::Provider);

        assert_eq!(f.gateway.quota().remaining(), 8);
        let stats = f.gateway.stats();
        assert_eq!(stats.upstream_calls, 2);
        assert_eq!(stats.upstream_failures, 1);
    }

    #[tokio::test]
    async fn test_rate_limit_trips_breaker() {
        let f = fixture(10, 10, Echo::failing(vec![ProviderError::RateLimited("429".into())]));

        let result = f.gateway.complete(&pieces("A"), "s").await;
        assert_eq!(result, Err(GatewayError::QuotaExceeded { remaining: 0 }));
        assert_eq!(f.gateway.quota().remaining(), 0);

        let next = f.gateway.complete(&pieces("B"), "s").await;
        assert!(matches!(next, Err(GatewayError::QuotaExceeded { .. })));
        assert_eq!(f.provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_timeout_maps_to_upstream() {
        let mut echo = Echo::new();
        echo.delay = Duration::from_secs(5);
        let mut f = fixture(10, 10, echo);
        f.gateway = f.gateway.with_timeout(Duration::from_millis(50));

        let result = f.gateway.complete(&pieces("slow"), "s").await;
        assert_eq!(
            result,
            Err(GatewayError::Upstream(ProviderError::Timeout(50)))
        );
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_suppressed() {
        let mut echo = Echo::new();
        echo.delay = Duration::from_millis(100);
        let f = fixture(10, 10, echo);

        let p = pieces("same");
        let (first, second) = tokio::join!(
            f.gateway.complete(&p, "s1"),
            f.gateway.complete(&p, "s2")
        );

        assert!(first.is_ok());
        assert!(matches!(second, Err(GatewayError::DuplicateSuppressed { .. })));
        assert_eq!(f.provider.calls(), 1);
        assert_eq!(f.gateway.stats().duplicates, 1);
    }

    #[tokio::test]
    async fn test_rollover_clears_cache_and_quota() {
        let f = fixture(1, 10, Echo::new());
        f.gateway.complete(&pieces("A"), "s").await.unwrap();
        assert_eq!(f.gateway.cache().len(), 1);

        f.clock.advance_days(1);
        let again = f.gateway.complete(&pieces("A"), "s").await.unwrap();
        assert_eq!(again.source, CompletionSource::Provider);
        assert_eq!(f.provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_rollover_keeps_cache_when_decoupled() {
        let mut f = fixture(1, 10, Echo::new());
        f.gateway = f.gateway.with_cache_rollover(false);
        f.gateway.complete(&pieces("A"), "s").await.unwrap();

        f.clock.advance_days(1);
        let again = f.gateway.complete(&pieces("A"), "s").await.unwrap();
        assert_eq!(again.source, CompletionSource::Cache);
        assert_eq!(f.gateway.quota().remaining(), 1);
    }

    #[tokio::test]
    async fn test_one_event_per_attempt() {
        let f = fixture(1, 10, Echo::new());
        f.gateway.complete(&pieces("A"), "s").await.unwrap();
        f.gateway.complete(&pieces("A"), "s").await.unwrap();
        let _ = f.gateway.complete(&pieces("B"), "s").await;

        let outcomes: Vec<_> = f
            .sink
            .gateway_events()
            .into_iter()
            .map(|e| e.outcome)
            .collect();
        assert_eq!(
            outcomes,
            vec![
                GatewayOutcome::Success,
                GatewayOutcome::CacheHit,
                GatewayOutcome::Refused
            ]
        );
        assert!(f.sink.gateway_events().iter().all(|e| e.fingerprint.len() == 12));
    }

    #[test]
    fn test_render_includes_context_and_collapses_whitespace() {
        let context = ReducedContext {
            turns: vec![ContextTurn {
                user: "where is  the\nspa?".to_string(),
                assistant: "Level 2.".to_string(),
            }],
        };
        let prompt = PromptPieces::new("  and the gym? ", context)
            .with_preamble("Be brief.")
            .render();
        assert_eq!(
            prompt,
            "Be brief.\n\nConversation so far:\nUser: where is the spa?\nAssistant: Level 2.\n\nUser: and the gym?\nAssistant:"
        );
    }

    #[test]
    fn test_fingerprint_covers_parameters() {
        let base = NormalizedRequest {
            model: "m".to_string(),
            max_tokens: Some(10),
            prompt: "p".to_string(),
        };
        let other_tokens = NormalizedRequest {
            max_tokens: Some(20),
            ..base.clone()
        };
        let other_model = NormalizedRequest {
            model: "n".to_string(),
            ..base.clone()
        };
        assert_ne!(base.fingerprint(), other_tokens.fingerprint());
        assert_ne!(base.fingerprint(), other_model.fingerprint());
        assert_eq!(base.fingerprint(), base.clone().fingerprint());
    }
}
