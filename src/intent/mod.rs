//! Intent classification.
//!
//! [`IntentClassifier::classify`] turns a message, its extraction and the
//! session state into a [`RoutingDecision`]. Rules, first match wins:
//!
//! 1. A pending workflow whose required fields are now satisfied resumes
//!    through its handler.
//! 2. Canonical simple intents (greeting, thanks, cancel, handoff, unclear)
//!    get a template.
//! 3. With a pending workflow, conflicting values ask for clarification and
//!    new partial fields are recorded without any call.
//! 4. Task patterns and domain keywords go straight to a handler.
//! 5. Everything else goes to the model with a reduced context.

pub mod decision;

pub use decision::{
    Action, ContextTurn, DecisionReason, Domain, ReducedContext, Route, RoutePath,
    RoutingDecision, TemplateKey,
};

use crate::config::ContextConfig;
use crate::extract::{normalize_typos, ExtractionResult, Field};
use crate::logging::truncate_chars;
use crate::session::{ConversationState, WorkflowKind};
use regex::Regex;
use std::sync::LazyLock;

static GREETING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:hi|hello|hey|hiya|howdy|greetings|good\s+(?:morning|afternoon|evening|day))(?:\s+(?:there|all|team|bot))?[\s!.,]*$",
    )
    .unwrap()
});

static THANKS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:thanks|thank\s+you|thx|ty|cheers|much\s+appreciated)(?:\s+(?:so|very)\s+much)?(?:\s+for\s+(?:your|the)\s+help)?[\s!.,]*$",
    )
    .unwrap()
});

static CANCEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:cancel|stop|abort|never\s*mind|forget\s+it)(?:\s+(?:it|that|this))?[\s!.,]*$",
    )
    .unwrap()
});

static HANDOFF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:(?:talk|speak|chat)\s+(?:to|with)\s+(?:a\s+|an\s+|the\s+)?(?:human|person|agent|representative|someone|real\s+person|manager|supervisor)|escalate|live\s+agent|human\s+agent|operator)\b",
    )
    .unwrap()
});

static UNCLEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\?+|huh|what|hm+|um+|uh+|idk|eh|ok|okay|k|lol)[\s?!.]*$").unwrap()
});

static CREATE_USER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:create|add|new|register|onboard|set\s+up)\b.*\b(?:user|account|employee)s?\b",
    )
    .unwrap()
});

static DELETE_USER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:delete|remove|deactivate|disable|offboard)\b.*\b(?:user|account|employee)s?\b",
    )
    .unwrap()
});

static UPDATE_USER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:update|edit|change|modify)\b.*\b(?:user|account|employee)s?\b").unwrap()
});

static BLOCK_USER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:block|suspend)\b.*\b(?:user|account|employee)s?\b").unwrap()
});

static UNBLOCK_USER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:unblock|unsuspend|reactivate|reinstate)\b.*\b(?:user|account|employee)s?\b",
    )
    .unwrap()
});

static CREATE_SERVICE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:create|add|new|open|log|raise|submit|file)\b.*\b(?:service|work\s+order|ticket|maintenance\s+request)s?\b",
    )
    .unwrap()
});

static LIST_USERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:list|show|view|display|see|all|who\s+are)\b.*\busers?\b|\busers?\s+list\b")
        .unwrap()
});

static TROUBLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:trouble|troubleshoot\w*|error|not\s+working|issue|problem|broken|fail(?:ed|ing|s)?|can'?t|cannot|won'?t|down)\b",
    )
    .unwrap()
});

static SERVICES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:services?|work\s+orders?|tickets?)\b").unwrap());

static FAQ: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:faq|help|how\s+do\s+i|how\s+to|how\s+can\s+i|question|guide|policy|what\s+is|where\s+is|when\s+is)\b",
    )
    .unwrap()
});

/// Canonical intents answerable by a static template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimpleIntent {
    Greeting,
    Thanks,
    Unclear,
    Handoff,
    Cancel,
}

/// Match the whole message against the canonical simple intents.
///
/// ```
/// use helpdesk::intent::{simple_intent, SimpleIntent};
///
/// assert_eq!(simple_intent("Hello!"), Some(SimpleIntent::Greeting));
/// assert_eq!(simple_intent("hello, add user Jo"), None);
/// assert_eq!(simple_intent("   "), Some(SimpleIntent::Unclear));
/// ```
pub fn simple_intent(raw: &str) -> Option<SimpleIntent> {
    let text = raw.trim().to_lowercase();
    if text.is_empty() || !text.chars().any(char::is_alphanumeric) {
        return Some(SimpleIntent::Unclear);
    }
    if CANCEL.is_match(&text) {
        Some(SimpleIntent::Cancel)
    } else if HANDOFF.is_match(&text) {
        Some(SimpleIntent::Handoff)
    } else if GREETING.is_match(&text) {
        Some(SimpleIntent::Greeting)
    } else if THANKS.is_match(&text) {
        Some(SimpleIntent::Thanks)
    } else if UNCLEAR.is_match(&text) {
        Some(SimpleIntent::Unclear)
    } else {
        None
    }
}

/// Workflow a message asks to start, if any.
///
/// `normalized` is the typo-normalized, lowercased message. Delimited input
/// carrying an email address is treated as a user record.
pub fn detect_task(normalized: &str, extraction: &ExtractionResult) -> Option<WorkflowKind> {
    if UNBLOCK_USER.is_match(normalized) {
        Some(WorkflowKind::UnblockUser)
    } else if BLOCK_USER.is_match(normalized) {
        Some(WorkflowKind::BlockUser)
    } else if DELETE_USER.is_match(normalized) {
        Some(WorkflowKind::DeleteUser)
    } else if UPDATE_USER.is_match(normalized) {
        Some(WorkflowKind::UpdateUser)
    } else if CREATE_USER.is_match(normalized) {
        Some(WorkflowKind::CreateUser)
    } else if CREATE_SERVICE.is_match(normalized) {
        Some(WorkflowKind::CreateService)
    } else if extraction.is_structured() && extraction.contains(Field::Email) {
        Some(WorkflowKind::CreateUser)
    } else {
        None
    }
}

/// Field-less domain request answered directly by a handler.
pub fn domain_request(normalized: &str) -> Option<Action> {
    if LIST_USERS.is_match(normalized) {
        Some(Action::ListUsers)
    } else if TROUBLE.is_match(normalized) {
        Some(Action::Troubleshoot)
    } else if SERVICES.is_match(normalized) {
        Some(Action::ListServices)
    } else if FAQ.is_match(normalized) {
        Some(Action::AnswerFaq)
    } else {
        None
    }
}

/// Positional field order for extraction in the current state.
pub fn expected_fields(state: &ConversationState) -> &'static [Field] {
    state
        .pending()
        .map(|w| w.kind.field_order())
        .unwrap_or(WorkflowKind::CreateUser.field_order())
}

/// Rule table deciding the dispatch path for each turn.
#[derive(Debug, Clone)]
pub struct IntentClassifier {
    context: ContextConfig,
}

impl IntentClassifier {
    pub fn new(context: ContextConfig) -> Self {
        Self { context }
    }

    pub fn classify(
        &self,
        raw: &str,
        extraction: &ExtractionResult,
        state: &ConversationState,
    ) -> RoutingDecision {
        let normalized = normalize_typos(raw.trim()).to_lowercase();
        let task = detect_task(&normalized, extraction);

        // A message that explicitly starts another task is not input for
        // the pending one.
        let pending = state
            .pending()
            .filter(|w| task.is_none_or(|kind| kind == w.kind));

        if let Some(workflow) = pending {
            if workflow.is_satisfied_by(extraction) {
                return RoutingDecision::handler(
                    Action::from(workflow.kind),
                    DecisionReason::ResumeWorkflow,
                );
            }
        }

        if let Some(intent) = simple_intent(raw) {
            return match intent {
                SimpleIntent::Greeting => {
                    RoutingDecision::template(TemplateKey::Greeting, DecisionReason::Greeting)
                }
                SimpleIntent::Thanks => {
                    RoutingDecision::template(TemplateKey::Thanks, DecisionReason::Thanks)
                }
                SimpleIntent::Unclear => {
                    RoutingDecision::template(TemplateKey::Unclear, DecisionReason::Unclear)
                }
                SimpleIntent::Handoff => {
                    RoutingDecision::template(TemplateKey::Handoff, DecisionReason::Handoff)
                }
                SimpleIntent::Cancel if state.pending().is_some() => {
                    RoutingDecision::template(TemplateKey::Cancelled, DecisionReason::Cancel)
                }
                SimpleIntent::Cancel => {
                    RoutingDecision::template(TemplateKey::NothingToCancel, DecisionReason::Cancel)
                }
            };
        }

        if let Some(workflow) = pending {
            if extraction.conflicts_with(workflow.kind.field_order()) {
                return RoutingDecision::template(TemplateKey::Clarify, DecisionReason::Clarify);
            }
            if !workflow.new_fields(extraction).is_empty() {
                return RoutingDecision {
                    route: Route::PatternOnly,
                    reason: DecisionReason::WorkflowProgress,
                };
            }
        }

        if let Some(kind) = task {
            if extraction.conflicts_with(kind.field_order()) {
                return RoutingDecision::model(
                    self.reduce_context(state),
                    DecisionReason::AmbiguousExtraction,
                );
            }
            let reason = if extraction.has_required_fields(kind.required_fields()) {
                DecisionReason::TaskReady
            } else {
                DecisionReason::TaskStart
            };
            return RoutingDecision::handler(Action::from(kind), reason);
        }

        if let Some(action) = domain_request(&normalized) {
            return RoutingDecision::handler(action, DecisionReason::DomainKeyword);
        }

        let reason = if extraction.is_ambiguous() {
            DecisionReason::AmbiguousExtraction
        } else {
            DecisionReason::Delegated
        };
        RoutingDecision::model(self.reduce_context(state), reason)
    }

    /// Last turns of the session, each side truncated to the char budget.
    pub fn reduce_context(&self, state: &ConversationState) -> ReducedContext {
        let budget = self.context.turn_char_budget;
        let skip = state.turn_count().saturating_sub(self.context.max_turns);
        ReducedContext {
            turns: state
                .recent_turns()
                .skip(skip)
                .map(|turn| ContextTurn {
                    user: truncate_chars(&turn.user, budget),
                    assistant: truncate_chars(&turn.assistant, budget),
                })
                .collect(),
        }
    }
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::new(ContextConfig::default())
    }
}
