//! Per-session conversation state.
//!
//! A [`ConversationState`] holds the last few exchanges, an optional
//! [`PendingWorkflow`] and the most recent extraction. States live in a
//! [`SessionStore`] keyed by session id and are discarded when the session
//! ends, sits idle past the configured timeout, or is the least recently
//! active one when the store is full. Nothing is persisted across restarts.

use crate::config::ContextConfig;
use crate::extract::{ExtractionResult, Field};
use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicI64, Ordering};

/// Multi-turn tasks the bot knows how to collect fields for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkflowKind {
    CreateUser,
    CreateService,
    DeleteUser,
    /// Email identifies the user; any other fields are the changes
    UpdateUser,
    BlockUser,
    UnblockUser,
}

impl WorkflowKind {
    /// Fields that must all be present before the workflow can complete.
    pub fn required_fields(&self) -> &'static [Field] {
        match self {
            WorkflowKind::CreateUser => &[Field::Name, Field::Email],
            WorkflowKind::CreateService => &[Field::ServiceName],
            WorkflowKind::DeleteUser
            | WorkflowKind::UpdateUser
            | WorkflowKind::BlockUser
            | WorkflowKind::UnblockUser => &[Field::Email],
        }
    }

    /// Positional order for delimiter-separated input.
    pub fn field_order(&self) -> &'static [Field] {
        match self {
            WorkflowKind::CreateUser => &[Field::Name, Field::Email, Field::Phone, Field::Role],
            WorkflowKind::CreateService => &[Field::ServiceName, Field::Priority],
            WorkflowKind::UpdateUser => &[Field::Email, Field::Name, Field::Phone, Field::Role],
            WorkflowKind::DeleteUser | WorkflowKind::BlockUser | WorkflowKind::UnblockUser => {
                &[Field::Email]
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowKind::CreateUser => "create-user",
            WorkflowKind::CreateService => "create-service",
            WorkflowKind::DeleteUser => "delete-user",
            WorkflowKind::UpdateUser => "update-user",
            WorkflowKind::BlockUser => "block-user",
            WorkflowKind::UnblockUser => "unblock-user",
        }
    }
}

impl std::fmt::Display for WorkflowKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An in-progress workflow and the fields gathered for it so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingWorkflow {
    pub kind: WorkflowKind,
    pub collected: BTreeMap<Field, String>,
}

impl PendingWorkflow {
    pub fn new(kind: WorkflowKind) -> Self {
        Self {
            kind,
            collected: BTreeMap::new(),
        }
    }

    pub fn with_fields(kind: WorkflowKind, fields: BTreeMap<Field, String>) -> Self {
        let mut workflow = Self::new(kind);
        workflow.collected = fields
            .into_iter()
            .filter(|(f, _)| kind.field_order().contains(f))
            .collect();
        workflow
    }

    /// Collected fields overlaid with this turn's relevant extraction.
    pub fn merged(&self, extraction: &ExtractionResult) -> BTreeMap<Field, String> {
        let mut merged = self.collected.clone();
        for (field, value) in extraction.fields() {
            if self.kind.field_order().contains(field) {
                merged.insert(*field, value.clone());
            }
        }
        merged
    }

    /// Whether the extraction completes the required field set.
    pub fn is_satisfied_by(&self, extraction: &ExtractionResult) -> bool {
        let merged = self.merged(extraction);
        self.kind
            .required_fields()
            .iter()
            .all(|f| merged.contains_key(f))
    }

    /// Fields in the extraction this workflow wants but does not yet hold.
    pub fn new_fields(&self, extraction: &ExtractionResult) -> Vec<Field> {
        extraction
            .fields()
            .keys()
            .copied()
            .filter(|f| self.kind.field_order().contains(f) && !self.collected.contains_key(f))
            .collect()
    }

    /// Record relevant extracted fields; returns how many were new.
    pub fn absorb(&mut self, extraction: &ExtractionResult) -> usize {
        let new = self.new_fields(extraction).len();
        self.collected = self.merged(extraction);
        new
    }

    /// Required fields still missing.
    pub fn missing(&self) -> Vec<Field> {
        self.kind
            .required_fields()
            .iter()
            .copied()
            .filter(|f| !self.collected.contains_key(f))
            .collect()
    }
}

/// One user/assistant exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Turn {
    pub user: String,
    pub assistant: String,
    pub at: DateTime<Utc>,
}

/// Rolling state for one session.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationState {
    session_id: String,
    recent_turns: VecDeque<Turn>,
    max_turns: usize,
    pending: Option<PendingWorkflow>,
    last_extraction: Option<ExtractionResult>,
    created_at: DateTime<Utc>,
    last_active: DateTime<Utc>,
}

impl ConversationState {
    pub fn new(session_id: impl Into<String>, max_turns: usize) -> Self {
        let max_turns = max_turns.clamp(1, crate::config::MAX_CONTEXT_TURNS);
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            recent_turns: VecDeque::with_capacity(max_turns),
            max_turns,
            pending: None,
            last_extraction: None,
            created_at: now,
            last_active: now,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Oldest first.
    pub fn recent_turns(&self) -> impl Iterator<Item = &Turn> {
        self.recent_turns.iter()
    }

    pub fn turn_count(&self) -> usize {
        self.recent_turns.len()
    }

    /// Append an exchange, evicting the oldest beyond capacity.
    pub fn push_turn(&mut self, user: impl Into<String>, assistant: impl Into<String>) {
        if self.recent_turns.len() == self.max_turns {
            self.recent_turns.pop_front();
        }
        self.recent_turns.push_back(Turn {
            user: user.into(),
            assistant: assistant.into(),
            at: Utc::now(),
        });
    }

    pub fn pending(&self) -> Option<&PendingWorkflow> {
        self.pending.as_ref()
    }

    pub fn pending_mut(&mut self) -> Option<&mut PendingWorkflow> {
        self.pending.as_mut()
    }

    pub fn begin(&mut self, workflow: PendingWorkflow) {
        tracing::debug!(session_id = %self.session_id, workflow = %workflow.kind, "workflow started");
        self.pending = Some(workflow);
    }

    /// Clear the pending workflow, returning it.
    pub fn clear_pending(&mut self) -> Option<PendingWorkflow> {
        let cleared = self.pending.take();
        if let Some(workflow) = &cleared {
            tracing::debug!(session_id = %self.session_id, workflow = %workflow.kind, "workflow cleared");
        }
        cleared
    }

    pub fn last_extraction(&self) -> Option<&ExtractionResult> {
        self.last_extraction.as_ref()
    }

    pub fn set_last_extraction(&mut self, extraction: ExtractionResult) {
        self.last_extraction = Some(extraction);
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_active(&self) -> DateTime<Utc> {
        self.last_active
    }

    pub fn touch(&mut self, at: DateTime<Utc>) {
        self.last_active = at;
    }
}

/// How often creation triggers a full idle sweep.
const SWEEP_INTERVAL_SECS: i64 = 60;

/// Longer timeouts are treated as "never idle".
const MAX_IDLE_SECS: i64 = 100 * 365 * 24 * 3600;

/// Concurrent map of live sessions.
#[derive(Debug)]
pub struct SessionStore {
    sessions: DashMap<String, ConversationState>,
    max_turns: usize,
    idle_timeout: TimeDelta,
    max_sessions: usize,
    last_sweep: AtomicI64,
}

impl SessionStore {
    pub fn new(config: &ContextConfig) -> Self {
        let idle_secs = i64::try_from(config.idle_timeout_seconds)
            .unwrap_or(i64::MAX)
            .min(MAX_IDLE_SECS);
        Self {
            sessions: DashMap::new(),
            max_turns: config.max_turns,
            idle_timeout: TimeDelta::seconds(idle_secs),
            max_sessions: config.max_sessions.max(1),
            last_sweep: AtomicI64::new(Utc::now().timestamp()),
        }
    }

    /// Copy of the session's state, created fresh when the id is unknown.
    ///
    /// The flag is true when a new state was created. Creation sweeps idle
    /// sessions and makes room when the store is full.
    pub fn load_or_create(&self, session_id: &str) -> (ConversationState, bool) {
        if let Some(state) = self.sessions.get(session_id) {
            return (state.clone(), false);
        }

        let now = Utc::now();
        let last = self.last_sweep.load(Ordering::Relaxed);
        if now.timestamp() - last >= SWEEP_INTERVAL_SECS
            && self
                .last_sweep
                .compare_exchange(last, now.timestamp(), Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
        {
            self.sweep_idle(now);
        }
        self.make_room();

        let state = ConversationState::new(session_id, self.max_turns);
        self.sessions
            .insert(session_id.to_string(), state.clone());
        (state, true)
    }

    /// Store the state and mark the session active now.
    pub fn save(&self, mut state: ConversationState) {
        state.touch(Utc::now());
        self.sessions.insert(state.session_id.clone(), state);
    }

    /// Drop sessions idle longer than the timeout as of `now`.
    ///
    /// Returns how many were removed.
    pub fn sweep_idle(&self, now: DateTime<Utc>) -> usize {
        let before = self.sessions.len();
        let timeout = self.idle_timeout;
        self.sessions
            .retain(|_, state| now.signed_duration_since(state.last_active) <= timeout);
        let removed = before.saturating_sub(self.sessions.len());
        if removed > 0 {
            tracing::debug!(removed, live = self.sessions.len(), "idle sessions swept");
        }
        removed
    }

    /// Evict least recently active sessions until one more fits.
    fn make_room(&self) {
        while self.sessions.len() >= self.max_sessions {
            let oldest = self
                .sessions
                .iter()
                .min_by_key(|entry| entry.value().last_active)
                .map(|entry| entry.key().clone());
            let Some(id) = oldest else {
                break;
            };
            self.sessions.remove(&id);
            tracing::debug!(session_id = %id, "session evicted, store full");
        }
    }

    pub fn get(&self, session_id: &str) -> Option<ConversationState> {
        self.sessions.get(session_id).map(|s| s.clone())
    }

    /// Discard a session. Returns false when it did not exist.
    pub fn end(&self, session_id: &str) -> bool {
        self.sessions.remove(session_id).is_some()
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.contains_key(session_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recent_turns_bounded_fifo() {
        let mut state = ConversationState::new("s1", 2);
        state.push_turn("one", "1");
        state.push_turn("two", "2");
        state.push_turn("three", "3");

        let users: Vec<_> = state.recent_turns().map(|t| t.user.as_str()).collect();
        assert_eq!(users, vec!["two", "three"]);
    }

    #[test]
    fn test_max_turns_clamped_to_two() {
        let mut state = ConversationState::new("s1", 9);
        for i in 0..5 {
            state.push_turn(i.to_string(), "ok");
        }
        assert_eq!(state.turn_count(), 2);
    }

    #[test]
    fn test_pending_merge_and_satisfaction() {
        let mut workflow = PendingWorkflow::new(WorkflowKind::CreateUser);
        let first = ExtractionResult::empty().with_field(Field::Name, "John Doe");
        assert!(!workflow.is_satisfied_by(&first));
        assert_eq!(workflow.absorb(&first), 1);
        assert_eq!(workflow.missing(), vec![Field::Email]);

        let second = ExtractionResult::empty().with_field(Field::Email, "john@hotel.com");
        assert!(workflow.is_satisfied_by(&second));
    }

    #[test]
    fn test_pending_ignores_unrelated_fields() {
        let workflow = PendingWorkflow::new(WorkflowKind::DeleteUser);
        let extraction = ExtractionResult::empty().with_field(Field::Priority, "high");
        assert!(workflow.new_fields(&extraction).is_empty());
        assert!(workflow.merged(&extraction).is_empty());
    }

    #[test]
    fn test_with_fields_filters_to_workflow() {
        let mut fields = BTreeMap::new();
        fields.insert(Field::ServiceName, "Spa".to_string());
        fields.insert(Field::Email, "x@hotel.com".to_string());
        let workflow = PendingWorkflow::with_fields(WorkflowKind::CreateService, fields);
        assert_eq!(workflow.collected.len(), 1);
        assert!(workflow.missing().is_empty());
    }

    #[test]
    fn test_clear_pending() {
        let mut state = ConversationState::new("s1", 2);
        assert!(state.clear_pending().is_none());
        state.begin(PendingWorkflow::new(WorkflowKind::CreateService));
        assert_eq!(
            state.clear_pending().map(|w| w.kind),
            Some(WorkflowKind::CreateService)
        );
        assert!(state.pending().is_none());
    }

    #[test]
    fn test_store_create_on_miss_and_end() {
        let store = SessionStore::new(&ContextConfig::default());
        let (mut state, created) = store.load_or_create("abc");
        assert!(created);
        state.push_turn("hi", "hello");
        store.save(state);

        let (state, created) = store.load_or_create("abc");
        assert!(!created);
        assert_eq!(state.turn_count(), 1);

        assert!(store.end("abc"));
        assert!(!store.end("abc"));
        assert!(store.is_empty());
    }

    fn store(idle_timeout_seconds: u64, max_sessions: usize) -> SessionStore {
        SessionStore::new(&ContextConfig {
            idle_timeout_seconds,
            max_sessions,
            ..Default::default()
        })
    }

    #[test]
    fn test_sweep_drops_only_idle_sessions() {
        let store = store(60, 100);
        let (mut old, _) = store.load_or_create("old");
        old.touch(Utc::now() - TimeDelta::seconds(120));
        store.sessions.insert("old".to_string(), old);
        let (fresh, _) = store.load_or_create("fresh");
        store.save(fresh);

        assert_eq!(store.sweep_idle(Utc::now()), 1);
        assert!(!store.contains("old"));
        assert!(store.contains("fresh"));

        assert_eq!(store.sweep_idle(Utc::now() + TimeDelta::seconds(61)), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn test_full_store_evicts_least_recently_active() {
        let store = store(1800, 3);
        let base = Utc::now();
        for (i, id) in ["a", "b", "c"].into_iter().enumerate() {
            let (mut state, _) = store.load_or_create(id);
            state.touch(base + TimeDelta::seconds(i as i64));
            store.sessions.insert(id.to_string(), state);
        }
        // "a" becomes the most recent
        let (mut a, _) = store.load_or_create("a");
        a.touch(base + TimeDelta::seconds(10));
        store.sessions.insert("a".to_string(), a);

        let (_, created) = store.load_or_create("d");
        assert!(created);
        assert_eq!(store.len(), 3);
        assert!(!store.contains("b"));
        assert!(store.contains("a") && store.contains("c") && store.contains("d"));
    }

    #[test]
    fn test_one_shot_sessions_stay_bounded() {
        let store = store(1800, 50);
        for i in 0..500 {
            let (state, _) = store.load_or_create(&format!("anon-{i}"));
            store.save(state);
        }
        assert_eq!(store.len(), 50);
        assert!(store.contains("anon-499"));
    }
}
