//! Symptom table for common problems, backed by the FAQ.

use super::faq::keywords;
use super::{DomainHandler, FaqBook, HandlerReply, HandlerRequest};
use crate::intent::Domain;
use std::sync::Arc;

#[derive(Debug, Clone)]
struct Symptom {
    title: &'static str,
    keywords: &'static [&'static str],
    steps: &'static [&'static str],
}

const SYMPTOMS: &[Symptom] = &[
    Symptom {
        title: "Cannot log in",
        keywords: &["login", "log", "password", "locked", "signin", "sign"],
        steps: &[
            "Check the email or phone number is typed exactly as registered.",
            "Make sure the account is not blocked (ask a Company Admin).",
            "Ask a Company Admin to send a password reset.",
        ],
    },
    Symptom {
        title: "Invitation not received",
        keywords: &["invite", "invitation", "received", "whatsapp", "sms"],
        steps: &[
            "Confirm the phone number includes the country code.",
            "Check the spam folder when the invite went by email.",
            "Resend the invitation from the user's three-dot menu.",
        ],
    },
    Symptom {
        title: "Module missing from the dashboard",
        keywords: &["module", "missing", "dashboard", "permission", "access", "see"],
        steps: &[
            "Check the role has the module enabled under Settings > Roles.",
            "Ask the user to log out and back in so permissions refresh.",
        ],
    },
    Symptom {
        title: "App slow or not loading",
        keywords: &["slow", "loading", "load", "crash", "crashes", "freeze", "frozen", "app"],
        steps: &[
            "Check the device has a stable connection.",
            "Update the app to the latest version.",
            "Clear the app cache, then restart the device.",
        ],
    },
    Symptom {
        title: "Work order not updating",
        keywords: &["order", "ticket", "status", "updating", "stuck", "service"],
        steps: &[
            "Refresh the Service list; updates can take a minute to sync.",
            "Confirm the assignee still has the Service module enabled.",
        ],
    },
];

/// Symptom lookup that falls back to the FAQ.
#[derive(Debug, Clone)]
pub struct TroubleshootingGuide {
    faq: Arc<FaqBook>,
}

impl TroubleshootingGuide {
    pub fn new(faq: Arc<FaqBook>) -> Self {
        Self { faq }
    }

    fn diagnose(&self, text: &str) -> Option<&'static Symptom> {
        let words = keywords(text);
        SYMPTOMS
            .iter()
            .map(|s| {
                let hits = words.iter().filter(|w| s.keywords.contains(&w.as_str())).count();
                (hits, s)
            })
            .filter(|(hits, _)| *hits > 0)
            .max_by(|a, b| a.0.cmp(&b.0).then_with(|| b.1.title.cmp(a.1.title)))
            .map(|(_, s)| s)
    }
}

impl DomainHandler for TroubleshootingGuide {
    fn domain(&self) -> Domain {
        Domain::Troubleshooting
    }

    fn handle(&self, request: &HandlerRequest<'_>) -> HandlerReply {
        if let Some(symptom) = self.diagnose(request.text) {
            let mut text = format!("{}. Try these steps:", symptom.title);
            for (i, step) in symptom.steps.iter().enumerate() {
                text.push_str(&format!("\n{}. {}", i + 1, step));
            }
            text.push_str("\nIf it still fails, say \"talk to a human\".");
            return HandlerReply::text(text);
        }
        if let Some(entry) = self.faq.best(request.text) {
            return HandlerReply::text(entry.answer.clone());
        }
        HandlerReply::text(
            "Sorry you're having trouble. Please describe what you see and which screen you're on, or say \"talk to a human\".",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::StateDelta;
    use crate::intent::Action;
    use crate::session::ConversationState;
    use std::collections::BTreeMap;

    fn ask(text: &str) -> HandlerReply {
        let guide = TroubleshootingGuide::new(Arc::new(FaqBook::default()));
        let state = ConversationState::new("s", 2);
        let fields = BTreeMap::new();
        guide.handle(&HandlerRequest {
            action: Action::Troubleshoot,
            fields: &fields,
            state: &state,
            text,
        })
    }

    #[test]
    fn test_login_symptom() {
        let reply = ask("I can't login, my password is not working");
        assert!(reply.text.starts_with("Cannot log in. Try these steps:\n1."));
        assert_eq!(reply.delta, StateDelta::None);
    }

    #[test]
    fn test_best_symptom_wins() {
        let reply = ask("the app is slow and keeps loading forever");
        assert!(reply.text.starts_with("App slow or not loading"));
    }

    #[test]
    fn test_falls_back_to_faq() {
        let reply = ask("error when I revoke a device");
        assert!(reply.text.contains("Devices tab"));
    }

    #[test]
    fn test_generic_answer() {
        let reply = ask("zzz broken");
        assert!(reply.text.starts_with("Sorry you're having trouble"));
    }
}
