//! Routing decision types.
//!
//! Every path, reason and template is a closed enum so the classifier's
//! decision table is checked exhaustively.

use crate::session::WorkflowKind;
use serde::Serialize;

/// Dispatch path for a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoutePath {
    /// Static response keyed by intent
    Template,
    /// Extraction progress recorded, no handler or model call
    PatternOnly,
    /// Domain handler invoked directly
    HandlerDirect,
    /// Delegated to the language model
    ModelGateway,
}

impl RoutePath {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoutePath::Template => "template",
            RoutePath::PatternOnly => "pattern-only",
            RoutePath::HandlerDirect => "handler-direct",
            RoutePath::ModelGateway => "model-gateway",
        }
    }
}

impl std::fmt::Display for RoutePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Diagnostic tag explaining why a path was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DecisionReason {
    ResumeWorkflow,
    Greeting,
    Thanks,
    Unclear,
    Handoff,
    Cancel,
    Clarify,
    WorkflowProgress,
    TaskReady,
    TaskStart,
    DomainKeyword,
    AmbiguousExtraction,
    Delegated,
}

impl DecisionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionReason::ResumeWorkflow => "resume-workflow",
            DecisionReason::Greeting => "greeting",
            DecisionReason::Thanks => "thanks",
            DecisionReason::Unclear => "unclear",
            DecisionReason::Handoff => "handoff",
            DecisionReason::Cancel => "cancel",
            DecisionReason::Clarify => "clarify",
            DecisionReason::WorkflowProgress => "workflow-progress",
            DecisionReason::TaskReady => "task-ready",
            DecisionReason::TaskStart => "task-start",
            DecisionReason::DomainKeyword => "domain-keyword",
            DecisionReason::AmbiguousExtraction => "ambiguous-extraction",
            DecisionReason::Delegated => "delegated",
        }
    }
}

impl std::fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TemplateKey {
    Greeting,
    Thanks,
    Unclear,
    Handoff,
    Cancelled,
    NothingToCancel,
    Clarify,
    ServiceBusy,
    Apology,
    StillWorking,
}

/// Handler families outside the routing core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Users,
    Services,
    Faq,
    Troubleshooting,
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Users => "users",
            Domain::Services => "services",
            Domain::Faq => "faq",
            Domain::Troubleshooting => "troubleshooting",
        }
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Concrete handler operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    CreateUser,
    DeleteUser,
    UpdateUser,
    BlockUser,
    UnblockUser,
    ListUsers,
    CreateService,
    ListServices,
    AnswerFaq,
    Troubleshoot,
}

impl Action {
    pub fn domain(&self) -> Domain {
        match self {
            Action::CreateUser
            | Action::DeleteUser
            | Action::UpdateUser
            | Action::BlockUser
            | Action::UnblockUser
            | Action::ListUsers => Domain::Users,
            Action::CreateService | Action::ListServices => Domain::Services,
            Action::AnswerFaq => Domain::Faq,
            Action::Troubleshoot => Domain::Troubleshooting,
        }
    }

    /// The multi-turn workflow this action belongs to, if any.
    pub fn workflow(&self) -> Option<WorkflowKind> {
        match self {
            Action::CreateUser => Some(WorkflowKind::CreateUser),
            Action::DeleteUser => Some(WorkflowKind::DeleteUser),
            Action::UpdateUser => Some(WorkflowKind::UpdateUser),
            Action::BlockUser => Some(WorkflowKind::BlockUser),
            Action::UnblockUser => Some(WorkflowKind::UnblockUser),
            Action::CreateService => Some(WorkflowKind::CreateService),
            Action::ListUsers | Action::ListServices | Action::AnswerFaq | Action::Troubleshoot => {
                None
            }
        }
    }
}

impl From<WorkflowKind> for Action {
    fn from(kind: WorkflowKind) -> Self {
        match kind {
            WorkflowKind::CreateUser => Action::CreateUser,
            WorkflowKind::CreateService => Action::CreateService,
            WorkflowKind::DeleteUser => Action::DeleteUser,
            WorkflowKind::UpdateUser => Action::UpdateUser,
            WorkflowKind::BlockUser => Action::BlockUser,
            WorkflowKind::UnblockUser => Action::UnblockUser,
        }
    }
}

/// A truncated exchange carried into a model request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextTurn {
    pub user: String,
    pub assistant: String,
}

/// Short history sent with a delegated turn.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReducedContext {
    pub turns: Vec<ContextTurn>,
}

impl ReducedContext {
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

/// Where a turn goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Template(TemplateKey),
    PatternOnly,
    Handler(Action),
    Model(ReducedContext),
}

/// Transient dispatch decision; logged, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingDecision {
    pub route: Route,
    pub reason: DecisionReason,
}

impl RoutingDecision {
    pub fn template(key: TemplateKey, reason: DecisionReason) -> Self {
        Self {
            route: Route::Template(key),
            reason,
        }
    }

    pub fn handler(action: Action, reason: DecisionReason) -> Self {
        Self {
            route: Route::Handler(action),
            reason,
        }
    }

    pub fn model(context: ReducedContext, reason: DecisionReason) -> Self {
        Self {
            route: Route::Model(context),
            reason,
        }
    }

    pub fn path(&self) -> RoutePath {
        match self.route {
            Route::Template(_) => RoutePath::Template,
            Route::PatternOnly => RoutePath::PatternOnly,
            Route::Handler(_) => RoutePath::HandlerDirect,
            Route::Model(_) => RoutePath::ModelGateway,
        }
    }
}
