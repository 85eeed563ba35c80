//! Staff user accounts.

use super::{DomainHandler, HandlerReply, HandlerRequest};
use crate::extract::{field_list, Field};
use crate::intent::{Action, Domain};
use crate::session::WorkflowKind;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRecord {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: String,
    pub blocked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// In-memory user directory keyed by lowercase email.
#[derive(Debug, Default)]
pub struct UserDirectory {
    users: DashMap<String, UserRecord>,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, email: &str) -> Option<UserRecord> {
        self.users.get(&email.to_lowercase()).map(|r| r.clone())
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Users sorted by name.
    pub fn list(&self) -> Vec<UserRecord> {
        let mut users: Vec<_> = self.users.iter().map(|r| r.value().clone()).collect();
        users.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.email.cmp(&b.email)));
        users
    }

    fn create(&self, request: &HandlerRequest<'_>) -> HandlerReply {
        let (Some(name), Some(email)) = (request.field(Field::Name), request.field(Field::Email))
        else {
            return HandlerReply::collect(WorkflowKind::CreateUser, request.fields);
        };

        let key = email.to_lowercase();
        let slot = match self.users.entry(key.clone()) {
            Entry::Occupied(_) => {
                return HandlerReply::complete(format!(
                    "A user with email {} already exists.",
                    email
                ));
            }
            Entry::Vacant(slot) => slot,
        };

        let now = Utc::now();
        let record = UserRecord {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: key,
            phone: request.field(Field::Phone).map(str::to_string),
            role: request.field(Field::Role).unwrap_or("staff").to_string(),
            blocked: false,
            created_at: now,
            updated_at: now,
        };
        tracing::info!(user_id = %record.id, role = %record.role, "user created");
        let text = format!(
            "Created user {} ({}) with role {}.",
            record.name, record.email, record.role
        );
        slot.insert(record);
        HandlerReply::complete(text)
    }

    /// Apply name, phone or role changes to the user identified by email.
    fn update(&self, request: &HandlerRequest<'_>) -> HandlerReply {
        let Some(email) = request.field(Field::Email) else {
            return HandlerReply::collect(WorkflowKind::UpdateUser, request.fields);
        };
        let Some(mut record) = self.users.get_mut(&email.to_lowercase()) else {
            return HandlerReply::complete(format!("No user found with email {}.", email));
        };

        let mut changed = Vec::new();
        if let Some(name) = request.field(Field::Name) {
            if record.name != name {
                record.name = name.to_string();
                changed.push(Field::Name);
            }
        }
        if let Some(phone) = request.field(Field::Phone) {
            if record.phone.as_deref() != Some(phone) {
                record.phone = Some(phone.to_string());
                changed.push(Field::Phone);
            }
        }
        if let Some(role) = request.field(Field::Role) {
            if record.role != role {
                record.role = role.to_string();
                changed.push(Field::Role);
            }
        }

        if changed.is_empty() {
            return HandlerReply::complete(format!(
                "Nothing to change for {}. Send the email with a new name, phone or role.",
                record.email
            ));
        }
        record.updated_at = Utc::now();
        tracing::info!(user_id = %record.id, changed = changed.len(), "user updated");
        HandlerReply::complete(format!(
            "Updated the {} for {} ({}).",
            field_list(&changed),
            record.name,
            record.email
        ))
    }

    fn set_blocked(&self, request: &HandlerRequest<'_>, blocked: bool) -> HandlerReply {
        let (kind, verb) = if blocked {
            (WorkflowKind::BlockUser, "blocked")
        } else {
            (WorkflowKind::UnblockUser, "unblocked")
        };
        let Some(email) = request.field(Field::Email) else {
            return HandlerReply::collect(kind, request.fields);
        };
        let Some(mut record) = self.users.get_mut(&email.to_lowercase()) else {
            return HandlerReply::complete(format!("No user found with email {}.", email));
        };

        if record.blocked == blocked {
            return HandlerReply::complete(format!(
                "User {} ({}) is already {}.",
                record.name, record.email, verb
            ));
        }
        record.blocked = blocked;
        record.updated_at = Utc::now();
        tracing::info!(user_id = %record.id, blocked, "user status changed");
        HandlerReply::complete(format!(
            "User {} ({}) has been {}.",
            record.name, record.email, verb
        ))
    }

    fn delete(&self, request: &HandlerRequest<'_>) -> HandlerReply {
        let Some(email) = request.field(Field::Email) else {
            return HandlerReply::collect(WorkflowKind::DeleteUser, request.fields);
        };
        match self.users.remove(&email.to_lowercase()) {
            Some((_, record)) => {
                tracing::info!(user_id = %record.id, "user deleted");
                HandlerReply::complete(format!("Removed user {} ({}).", record.name, record.email))
            }
            None => HandlerReply::complete(format!("No user found with email {}.", email)),
        }
    }

    fn render_list(&self) -> HandlerReply {
        let users = self.list();
        if users.is_empty() {
            return HandlerReply::text("There are no users yet. Say \"add a user\" to create one.");
        }
        let mut text = format!("{} user(s):", users.len());
        for user in users {
            text.push_str(&format!("\n- {} <{}> ({})", user.name, user.email, user.role));
            if user.blocked {
                text.push_str(" [blocked]");
            }
        }
        HandlerReply::text(text)
    }
}

impl DomainHandler for UserDirectory {
    fn domain(&self) -> Domain {
        Domain::Users
    }

    fn handle(&self, request: &HandlerRequest<'_>) -> HandlerReply {
        match request.action {
            Action::CreateUser => self.create(request),
            Action::DeleteUser => self.delete(request),
            Action::UpdateUser => self.update(request),
            Action::BlockUser => self.set_blocked(request, true),
            Action::UnblockUser => self.set_blocked(request, false),
            Action::ListUsers => self.render_list(),
            Action::CreateService
            | Action::ListServices
            | Action::AnswerFaq
            | Action::Troubleshoot => {
                tracing::warn!(action = ?request.action, "action sent to the user directory");
                HandlerReply::text("That request isn't handled by the user directory.")
            }
        }
    }
}
