//! Per-turn orchestration.
//!
//! [`Orchestrator::handle_message`] runs one turn end to end:
//! load or create the session, extract fields, classify, dispatch to a
//! template, a domain handler or the model gateway, then update the
//! session and emit one routing event. Every path ends in a response
//! string; failures become templates and are reported as a [`Fallback`].

pub mod templates;

use crate::cache::ResponseCache;
use crate::config::HelpdeskConfig;
use crate::extract::{extract, ExtractionResult};
use crate::gateway::{
    CompletionSource, GatewayError, GatewayStatsSnapshot, ModelGateway, PromptPieces,
};
use crate::handlers::{HandlerRegistry, HandlerRequest, StateDelta};
use crate::intent::{
    expected_fields, Action, DecisionReason, IntentClassifier, ReducedContext, Route, RoutePath,
    RoutingDecision, TemplateKey,
};
use crate::logging::{message_preview, EventSink, RoutingEvent, TelemetryEvent, TracingSink};
use crate::provider::{self, ProviderError, TextGenerator};
use crate::quota::{Clock, QuotaSnapshot, QuotaTracker, SystemClock};
use crate::session::{ConversationState, SessionStore};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Why a turn was answered with a fallback template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Fallback {
    QuotaExceeded,
    UpstreamFailed,
    DuplicateSuppressed,
    MissingHandler,
}

impl Fallback {
    pub fn as_str(&self) -> &'static str {
        match self {
            Fallback::QuotaExceeded => "quota_exceeded",
            Fallback::UpstreamFailed => "upstream_failed",
            Fallback::DuplicateSuppressed => "duplicate_suppressed",
            Fallback::MissingHandler => "missing_handler",
        }
    }
}

impl std::fmt::Display for Fallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one handled turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub session_id: String,
    pub response: String,
    pub decision: RoutingDecision,
    pub fallback: Option<Fallback>,
    pub quota: QuotaSnapshot,
    /// The model path was answered from the response cache
    pub cached: bool,
}

impl TurnOutcome {
    pub fn path(&self) -> RoutePath {
        self.decision.path()
    }

    pub fn reason(&self) -> DecisionReason {
        self.decision.reason
    }
}

/// Builder wiring the routing core from configuration.
pub struct OrchestratorBuilder {
    config: HelpdeskConfig,
    provider: Option<Arc<dyn TextGenerator>>,
    clock: Option<Arc<dyn Clock>>,
    sink: Option<Arc<dyn EventSink>>,
    handlers: Option<HandlerRegistry>,
}

impl OrchestratorBuilder {
    /// Use this generator instead of the configured provider.
    pub fn provider(mut self, provider: Arc<dyn TextGenerator>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn handlers(mut self, handlers: HandlerRegistry) -> Self {
        self.handlers = Some(handlers);
        self
    }

    pub fn build(self) -> Result<Orchestrator, ProviderError> {
        let config = self.config;
        let provider = match self.provider {
            Some(provider) => provider,
            None => provider::from_config(&config.provider)?,
        };
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let sink = self.sink.unwrap_or_else(|| Arc::new(TracingSink));

        let quota = Arc::new(QuotaTracker::with_clock(config.quota.clone(), clock));
        let cache = Arc::new(ResponseCache::new(config.cache.capacity));
        let gateway = ModelGateway::new(provider, quota, cache, sink.clone())
            .with_timeout(Duration::from_secs(config.provider.timeout_seconds))
            .with_max_tokens(config.provider.max_output_tokens)
            .with_cache_rollover(config.cache.clear_on_rollover);

        tracing::info!(
            provider = gateway.provider_name(),
            daily_limit = config.quota.daily_limit,
            cache_capacity = config.cache.capacity,
            max_turns = config.context.max_turns,
            "routing core ready"
        );

        Ok(Orchestrator {
            classifier: IntentClassifier::new(config.context.clone()),
            sessions: SessionStore::new(&config.context),
            gateway,
            handlers: self.handlers.unwrap_or_else(HandlerRegistry::with_defaults),
            sink,
            content_logging: config.logging.enable_content_logging,
        })
    }
}

/// Ties extraction, classification, handlers and the gateway together.
pub struct Orchestrator {
    classifier: IntentClassifier,
    sessions: SessionStore,
    gateway: ModelGateway,
    handlers: HandlerRegistry,
    sink: Arc<dyn EventSink>,
    content_logging: bool,
}

impl Orchestrator {
    pub fn builder(config: HelpdeskConfig) -> OrchestratorBuilder {
        OrchestratorBuilder {
            config,
            provider: None,
            clock: None,
            sink: None,
            handlers: None,
        }
    }

    /// Handle one user message and return the response.
    pub async fn handle_message(&self, session_id: &str, raw: &str) -> TurnOutcome {
        let (mut state, created) = self.sessions.load_or_create(session_id);
        if created {
            tracing::debug!(session_id, "unknown session, starting fresh state");
        }

        let extraction = extract(raw, expected_fields(&state));
        let decision = self.classifier.classify(raw, &extraction, &state);
        tracing::debug!(
            session_id,
            path = %decision.path(),
            reason = %decision.reason,
            fields = extraction.len(),
            "turn classified"
        );

        let mut fallback = None;
        let mut cached = false;
        let response = match &decision.route {
            Route::Template(key) => {
                if *key == TemplateKey::Cancelled {
                    if let Some(workflow) = state.clear_pending() {
                        tracing::debug!(session_id, workflow = %workflow.kind, "workflow cancelled");
                    }
                }
                templates::text(*key).to_string()
            }
            Route::PatternOnly => record_progress(&mut state, &extraction),
            Route::Handler(action) => {
                match self.dispatch(*action, &extraction, &mut state, raw) {
                    Some(text) => text,
                    None => {
                        fallback = Some(Fallback::MissingHandler);
                        templates::text(TemplateKey::Apology).to_string()
                    }
                }
            }
            Route::Model(context) => {
                let (text, model_fallback, from_cache) =
                    self.delegate(raw, context, session_id).await;
                fallback = model_fallback;
                cached = from_cache;
                text
            }
        };

        state.push_turn(raw, response.as_str());
        state.set_last_extraction(extraction);
        self.sessions.save(state);

        let quota = self.gateway.quota().snapshot();
        self.sink.record(&TelemetryEvent::Routing(RoutingEvent {
            timestamp: Utc::now(),
            session_id: session_id.to_string(),
            component: "router",
            path: decision.path(),
            reason: decision.reason,
            quota_remaining: quota.remaining,
            cache_hit: cached,
            fallback,
            preview: message_preview(raw, self.content_logging),
        }));

        TurnOutcome {
            session_id: session_id.to_string(),
            response,
            decision,
            fallback,
            quota,
            cached,
        }
    }

    /// Call the domain handler and apply its state delta.
    ///
    /// Returns `None` when no handler is registered for the domain.
    fn dispatch(
        &self,
        action: Action,
        extraction: &ExtractionResult,
        state: &mut ConversationState,
        raw: &str,
    ) -> Option<String> {
        let Some(handler) = self.handlers.get(action.domain()) else {
            tracing::warn!(domain = %action.domain(), "no handler registered");
            return None;
        };

        // Starting a different task replaces whatever was pending, so a
        // stale workflow can never resume on a later message.
        let replaced = match (action.workflow(), state.pending()) {
            (Some(kind), Some(pending)) if pending.kind != kind => Some((pending.kind, kind)),
            _ => None,
        };
        if let Some((from, to)) = replaced {
            tracing::debug!(from = %from, to = %to, "pending workflow replaced");
            state.clear_pending();
        }

        let fields = match (action.workflow(), state.pending()) {
            (Some(kind), Some(pending)) if pending.kind == kind => pending.merged(extraction),
            _ => extraction.fields().clone(),
        };
        let reply = handler.handle(&HandlerRequest {
            action,
            fields: &fields,
            state,
            text: raw,
        });

        match reply.delta {
            StateDelta::None => {}
            StateDelta::Begin(workflow) => state.begin(workflow),
            StateDelta::Complete => {
                if state
                    .pending()
                    .is_some_and(|p| Some(p.kind) == action.workflow())
                {
                    state.clear_pending();
                }
            }
        }
        Some(reply.text)
    }

    /// Model path: one retry on upstream failure, then a template.
    async fn delegate(
        &self,
        raw: &str,
        context: &ReducedContext,
        session_id: &str,
    ) -> (String, Option<Fallback>, bool) {
        let pieces = PromptPieces::new(raw, context.clone());
        let mut attempt = self.gateway.complete(&pieces, session_id).await;
        if let Err(e) = &attempt {
            if e.is_retryable() {
                tracing::warn!(session_id, error = %e, "model call failed, retrying once");
                attempt = self.gateway.complete(&pieces, session_id).await;
            }
        }

        match attempt {
            Ok(completion) => (
                completion.text,
                None,
                completion.source == CompletionSource::Cache,
            ),
            Err(GatewayError::QuotaExceeded { remaining }) => {
                tracing::warn!(session_id, remaining, "model quota exhausted, answering with template");
                (
                    templates::text(TemplateKey::ServiceBusy).to_string(),
                    Some(Fallback::QuotaExceeded),
                    false,
                )
            }
            Err(GatewayError::Upstream(e)) => {
                tracing::error!(session_id, error = %e, kind = e.kind(), "model call failed after retry");
                (
                    templates::text(TemplateKey::Apology).to_string(),
                    Some(Fallback::UpstreamFailed),
                    false,
                )
            }
            Err(GatewayError::DuplicateSuppressed { fingerprint }) => {
                tracing::info!(session_id, fingerprint = %fingerprint.short(), "duplicate request suppressed");
                (
                    templates::text(TemplateKey::StillWorking).to_string(),
                    Some(Fallback::DuplicateSuppressed),
                    false,
                )
            }
        }
    }

    /// Drop a session's state. Returns whether it existed.
    pub fn end_session(&self, session_id: &str) -> bool {
        let ended = self.sessions.end(session_id);
        tracing::debug!(session_id, ended, "session ended");
        ended
    }

    pub fn session(&self, session_id: &str) -> Option<ConversationState> {
        self.sessions.get(session_id)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn quota_snapshot(&self) -> QuotaSnapshot {
        self.gateway.quota().snapshot()
    }

    pub fn gateway_stats(&self) -> GatewayStatsSnapshot {
        self.gateway.stats()
    }

    pub fn cache_len(&self) -> usize {
        self.gateway.cache().len()
    }

    pub fn provider_name(&self) -> &str {
        self.gateway.provider_name()
    }
}

/// Absorb this turn's fields into the pending workflow.
fn record_progress(state: &mut ConversationState, extraction: &ExtractionResult) -> String {
    let Some(workflow) = state.pending_mut() else {
        return templates::text(TemplateKey::Unclear).to_string();
    };
    let recorded = workflow.new_fields(extraction);
    workflow.absorb(extraction);
    templates::progress(workflow.kind, &recorded, &workflow.missing())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::Field;
    use crate::handlers::{DomainHandler, HandlerReply};
    use crate::intent::Domain;
    use crate::logging::MemorySink;
    use crate::provider::OfflineProvider;
    use crate::session::WorkflowKind;

    fn orchestrator(sink: Arc<MemorySink>) -> Orchestrator {
        Orchestrator::builder(HelpdeskConfig::default())
            .provider(Arc::new(OfflineProvider::default()))
            .sink(sink)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_greeting_uses_template_and_emits_event() {
        let sink = Arc::new(MemorySink::default());
        let router = orchestrator(sink.clone());

        let outcome = router.handle_message("s1", "hello").await;
        assert_eq!(outcome.path(), RoutePath::Template);
        assert_eq!(outcome.response, templates::text(TemplateKey::Greeting));
        assert_eq!(outcome.fallback, None);

        let events = sink.routing_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].path, RoutePath::Template);
        assert!(events[0].preview.is_none());
        assert!(sink.gateway_events().is_empty());
    }

    #[tokio::test]
    async fn test_workflow_across_turns() {
        let router = orchestrator(Arc::new(MemorySink::default()));

        let first = router.handle_message("s", "add a new user").await;
        assert_eq!(first.path(), RoutePath::HandlerDirect);
        assert_eq!(first.reason(), DecisionReason::TaskStart);
        let state = router.session("s").unwrap();
        assert_eq!(state.pending().map(|p| p.kind), Some(WorkflowKind::CreateUser));

        let second = router.handle_message("s", "name is Jo Park").await;
        assert_eq!(second.path(), RoutePath::PatternOnly);
        assert_eq!(
            second.response,
            "Got the name. To create the user I still need the email."
        );

        let third = router.handle_message("s", "jo.park@hotel.com").await;
        assert_eq!(third.path(), RoutePath::HandlerDirect);
        assert_eq!(third.reason(), DecisionReason::ResumeWorkflow);
        assert!(third.response.starts_with("Created user Jo Park"));
        assert!(router.session("s").unwrap().pending().is_none());
        assert_eq!(router.gateway_stats().upstream_calls, 0);
    }

    #[tokio::test]
    async fn test_other_task_replaces_pending() {
        let router = orchestrator(Arc::new(MemorySink::default()));
        router.handle_message("s", "please remove a user").await;
        assert_eq!(
            router.session("s").unwrap().pending().map(|p| p.kind),
            Some(WorkflowKind::DeleteUser)
        );

        let outcome = router.handle_message("s", "open a work order").await;
        assert_eq!(outcome.reason(), DecisionReason::TaskStart);
        assert_eq!(
            router.session("s").unwrap().pending().map(|p| p.kind),
            Some(WorkflowKind::CreateService)
        );
    }

    #[tokio::test]
    async fn test_cancel_clears_pending() {
        let router = orchestrator(Arc::new(MemorySink::default()));
        router.handle_message("s", "open a work order").await;
        assert!(router.session("s").unwrap().pending().is_some());

        let outcome = router.handle_message("s", "cancel").await;
        assert_eq!(outcome.response, templates::text(TemplateKey::Cancelled));
        assert!(router.session("s").unwrap().pending().is_none());

        let again = router.handle_message("s", "cancel").await;
        assert_eq!(again.response, templates::text(TemplateKey::NothingToCancel));
    }

    #[tokio::test]
    async fn test_offline_model_path_falls_back_after_retry() {
        let sink = Arc::new(MemorySink::default());
        let router = orchestrator(sink.clone());

        let outcome = router
            .handle_message("s", "could you write a welcome note for the new chef")
            .await;
        assert_eq!(outcome.path(), RoutePath::ModelGateway);
        assert_eq!(outcome.fallback, Some(Fallback::UpstreamFailed));
        assert_eq!(outcome.response, templates::text(TemplateKey::Apology));
        assert_eq!(sink.gateway_events().len(), 2);
        assert_eq!(router.quota_snapshot().used, 2);
    }

    #[tokio::test]
    async fn test_missing_handler_falls_back() {
        struct OnlyFaq;
        impl DomainHandler for OnlyFaq {
            fn domain(&self) -> Domain {
                Domain::Faq
            }
            fn handle(&self, _request: &HandlerRequest<'_>) -> HandlerReply {
                HandlerReply::text("faq")
            }
        }
        let mut handlers = HandlerRegistry::new();
        handlers.register(Arc::new(OnlyFaq));
        let router = Orchestrator::builder(HelpdeskConfig::default())
            .provider(Arc::new(OfflineProvider::default()))
            .sink(Arc::new(MemorySink::default()))
            .handlers(handlers)
            .build()
            .unwrap();

        let outcome = router.handle_message("s", "list all users").await;
        assert_eq!(outcome.path(), RoutePath::HandlerDirect);
        assert_eq!(outcome.fallback, Some(Fallback::MissingHandler));
    }

    #[tokio::test]
    async fn test_history_is_bounded() {
        let router = orchestrator(Arc::new(MemorySink::default()));
        for message in ["hi", "thanks", "hello", "cancel"] {
            router.handle_message("s", message).await;
        }
        let state = router.session("s").unwrap();
        let users: Vec<_> = state.recent_turns().map(|t| t.user.as_str()).collect();
        assert_eq!(users, vec!["hello", "cancel"]);
        assert!(state.last_extraction().is_some_and(|e| !e.contains(Field::Email)));
    }

    #[tokio::test]
    async fn test_end_session() {
        let router = orchestrator(Arc::new(MemorySink::default()));
        router.handle_message("s", "hi").await;
        assert_eq!(router.session_count(), 1);
        assert!(router.end_session("s"));
        assert!(!router.end_session("s"));
        assert_eq!(router.session_count(), 0);
    }
}
