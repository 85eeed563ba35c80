//! Domain handlers invoked by the router.
//!
//! Each handler owns one [`Domain`] and answers a [`HandlerRequest`] with
//! text plus a [`StateDelta`] the router applies to the session. Handlers
//! never call the model gateway. Storage here is in-memory.

pub mod faq;
pub mod services;
pub mod troubleshooting;
pub mod users;

pub use faq::{FaqBook, FaqEntry};
pub use services::{ServiceDesk, WorkOrder};
pub use troubleshooting::TroubleshootingGuide;
pub use users::{UserDirectory, UserRecord};

use crate::extract::{field_list, Field};
use crate::intent::{Action, Domain};
use crate::session::{ConversationState, PendingWorkflow, WorkflowKind};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Input for a handler call.
#[derive(Debug, Clone, Copy)]
pub struct HandlerRequest<'a> {
    pub action: Action,
    /// Extracted fields, merged with anything a pending workflow collected
    pub fields: &'a BTreeMap<Field, String>,
    pub state: &'a ConversationState,
    /// Raw user message
    pub text: &'a str,
}

impl HandlerRequest<'_> {
    pub fn field(&self, field: Field) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }
}

/// Change a handler asks the router to make to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateDelta {
    None,
    /// Start (or replace) the pending workflow
    Begin(PendingWorkflow),
    /// The workflow for this action finished
    Complete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerReply {
    pub text: String,
    pub delta: StateDelta,
}

impl HandlerReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            delta: StateDelta::None,
        }
    }

    pub fn complete(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            delta: StateDelta::Complete,
        }
    }

    /// Ask for the missing fields and keep collecting.
    pub fn collect(kind: WorkflowKind, fields: &BTreeMap<Field, String>) -> Self {
        let workflow = PendingWorkflow::with_fields(kind, fields.clone());
        let missing = workflow.missing();
        let text = if workflow.collected.is_empty() {
            format!(
                "Sure, I can {}. Please send the {}.",
                workflow_goal(kind),
                field_list(&missing)
            )
        } else {
            format!(
                "Thanks. To {} I still need the {}.",
                workflow_goal(kind),
                field_list(&missing)
            )
        };
        Self {
            text,
            delta: StateDelta::Begin(workflow),
        }
    }
}

/// Short phrase describing what a workflow achieves.
pub fn workflow_goal(kind: WorkflowKind) -> &'static str {
    match kind {
        WorkflowKind::CreateUser => "create the user",
        WorkflowKind::CreateService => "open the work order",
        WorkflowKind::DeleteUser => "remove the user",
        WorkflowKind::UpdateUser => "update the user",
        WorkflowKind::BlockUser => "block the user",
        WorkflowKind::UnblockUser => "unblock the user",
    }
}

/// A handler for one domain.
pub trait DomainHandler: Send + Sync {
    fn domain(&self) -> Domain;

    fn handle(&self, request: &HandlerRequest<'_>) -> HandlerReply;
}

/// Domain to handler lookup used by the router.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<Domain, Arc<dyn DomainHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// In-memory reference handlers for every domain.
    pub fn with_defaults() -> Self {
        let faq = Arc::new(FaqBook::default());
        let mut registry = Self::new();
        registry.register(Arc::new(UserDirectory::new()));
        registry.register(Arc::new(ServiceDesk::new()));
        registry.register(faq.clone());
        registry.register(Arc::new(TroubleshootingGuide::new(faq)));
        registry
    }

    /// Register a handler, returning the one it replaced.
    pub fn register(&mut self, handler: Arc<dyn DomainHandler>) -> Option<Arc<dyn DomainHandler>> {
        self.handlers.insert(handler.domain(), handler)
    }

    pub fn get(&self, domain: Domain) -> Option<Arc<dyn DomainHandler>> {
        self.handlers.get(&domain).cloned()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut domains: Vec<_> = self.handlers.keys().map(Domain::as_str).collect();
        domains.sort_unstable();
        f.debug_struct("HandlerRegistry")
            .field("domains", &domains)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_cover_every_domain() {
        let registry = HandlerRegistry::with_defaults();
        for domain in [
            Domain::Users,
            Domain::Services,
            Domain::Faq,
            Domain::Troubleshooting,
        ] {
            assert_eq!(registry.get(domain).map(|h| h.domain()), Some(domain));
        }
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = HandlerRegistry::new();
        assert!(registry.register(Arc::new(FaqBook::default())).is_none());
        assert!(registry.register(Arc::new(FaqBook::default())).is_some());
        assert_eq!(registry.len(), 1);
        assert!(registry.get(Domain::Users).is_none());
    }

    #[test]
    fn test_collect_asks_for_missing_fields() {
        let mut fields = BTreeMap::new();
        let reply = HandlerReply::collect(WorkflowKind::CreateUser, &fields);
        assert_eq!(
            reply.text,
            "Sure, I can create the user. Please send the name and email."
        );

        fields.insert(Field::Name, "Jo Park".to_string());
        fields.insert(Field::ServiceName, "ignored".to_string());
        let reply = HandlerReply::collect(WorkflowKind::CreateUser, &fields);
        assert!(reply.text.ends_with("I still need the email."));
        match reply.delta {
            StateDelta::Begin(workflow) => {
                assert_eq!(workflow.kind, WorkflowKind::CreateUser);
                assert_eq!(workflow.collected.len(), 1);
            }
            other => panic!("unexpected delta {:?}", other),
        }
    }
}
