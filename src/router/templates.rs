//! Static responses.

use crate::extract::{field_list, Field};
use crate::handlers::workflow_goal;
use crate::intent::TemplateKey;
use crate::session::WorkflowKind;

pub fn text(key: TemplateKey) -> &'static str {
    match key {
        TemplateKey::Greeting => {
            "Hello! I can add, update, block or remove users, open work orders, answer FAQs and help troubleshoot. What do you need?"
        }
        TemplateKey::Thanks => "You're welcome! Anything else I can help with?",
        TemplateKey::Unclear => {
            "Sorry, I didn't catch that. You can say things like \"add a user\", \"list work orders\" or \"how do I reset a password?\"."
        }
        TemplateKey::Handoff => {
            "I'll pass this to the front office team. Someone will get back to you shortly. You can also reach them at the front desk."
        }
        TemplateKey::Cancelled => "Okay, I've cancelled that. What else can I do?",
        TemplateKey::NothingToCancel => "There's nothing in progress to cancel.",
        TemplateKey::Clarify => {
            "I found more than one value for the same detail. Could you send it again with just one?"
        }
        TemplateKey::ServiceBusy => {
            "I'm handling a lot of requests right now and can't answer that one today. Please try again later, or ask about users, work orders or FAQs."
        }
        TemplateKey::Apology => {
            "Sorry, I couldn't get an answer just now. Please try again in a moment."
        }
        TemplateKey::StillWorking => {
            "I'm still working on that exact question. Give me a moment and ask again."
        }
    }
}

/// Reply for a pattern-only turn that recorded part of a workflow.
pub fn progress(kind: WorkflowKind, recorded: &[Field], missing: &[Field]) -> String {
    let mut reply = if recorded.is_empty() {
        "Got it.".to_string()
    } else {
        format!("Got the {}.", field_list(recorded))
    };
    if !missing.is_empty() {
        reply.push_str(&format!(
            " To {} I still need the {}.",
            workflow_goal(kind),
            field_list(missing)
        ));
    }
    reply
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_text() {
        assert_eq!(
            progress(WorkflowKind::CreateUser, &[Field::Name], &[Field::Email]),
            "Got the name. To create the user I still need the email."
        );
        assert_eq!(progress(WorkflowKind::DeleteUser, &[], &[]), "Got it.");
    }

    #[test]
    fn test_every_template_non_empty() {
        for key in [
            TemplateKey::Greeting,
            TemplateKey::Thanks,
            TemplateKey::Unclear,
            TemplateKey::Handoff,
            TemplateKey::Cancelled,
            TemplateKey::NothingToCancel,
            TemplateKey::Clarify,
            TemplateKey::ServiceBusy,
            TemplateKey::Apology,
            TemplateKey::StillWorking,
        ] {
            assert!(!text(key).is_empty());
        }
    }
}
