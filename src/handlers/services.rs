//! Service requests and work orders.

use super::{DomainHandler, HandlerReply, HandlerRequest};
use crate::extract::Field;
use crate::intent::{Action, Domain};
use crate::session::WorkflowKind;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicU32, Ordering};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkOrder {
    pub number: u32,
    pub name: String,
    pub priority: String,
    pub created_at: DateTime<Utc>,
}

impl WorkOrder {
    pub fn reference(&self) -> String {
        format!("WO-{:04}", self.number)
    }
}

/// In-memory work-order desk.
#[derive(Debug, Default)]
pub struct ServiceDesk {
    orders: DashMap<u32, WorkOrder>,
    next_number: AtomicU32,
}

impl ServiceDesk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Orders, oldest first.
    pub fn list(&self) -> Vec<WorkOrder> {
        let mut orders: Vec<_> = self.orders.iter().map(|r| r.value().clone()).collect();
        orders.sort_by_key(|o| o.number);
        orders
    }

    fn create(&self, request: &HandlerRequest<'_>) -> HandlerReply {
        let Some(name) = request.field(Field::ServiceName) else {
            return HandlerReply::collect(WorkflowKind::CreateService, request.fields);
        };
        let order = WorkOrder {
            number: self.next_number.fetch_add(1, Ordering::Relaxed) + 1,
            name: name.to_string(),
            priority: request.field(Field::Priority).unwrap_or("normal").to_string(),
            created_at: Utc::now(),
        };
        tracing::info!(work_order = %order.reference(), priority = %order.priority, "work order opened");
        let text = format!(
            "Opened work order {} for \"{}\" (priority {}).",
            order.reference(),
            order.name,
            order.priority
        );
        self.orders.insert(order.number, order);
        HandlerReply::complete(text)
    }

    fn render_list(&self) -> HandlerReply {
        let orders = self.list();
        if orders.is_empty() {
            return HandlerReply::text("No open work orders.");
        }
        let mut text = format!("{} open work order(s):", orders.len());
        for order in orders {
            text.push_str(&format!(
                "\n- {} {} [{}]",
                order.reference(),
                order.name,
                order.priority
            ));
        }
        HandlerReply::text(text)
    }
}

impl DomainHandler for ServiceDesk {
    fn domain(&self) -> Domain {
        Domain::Services
    }

    fn handle(&self, request: &HandlerRequest<'_>) -> HandlerReply {
        match request.action {
            Action::CreateService => self.create(request),
            _ => self.render_list(),
        }
    }
}
