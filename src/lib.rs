//! Helpdesk - pattern-first support bot router
//!
//! Most support messages never need a language model. This library answers
//! greetings, structured data entry and routine requests from regex patterns,
//! templates and domain handlers, and only sends the remainder through a
//! quota-guarded, cached model gateway.
//!
//! The entry point is [`router::Orchestrator`], which ties the pieces together
//! for one conversation turn at a time.

pub mod api;
pub mod cache;
pub mod cli;
pub mod config;
pub mod extract;
pub mod gateway;
pub mod handlers;
pub mod intent;
pub mod logging;
pub mod provider;
pub mod quota;
pub mod router;
pub mod session;
