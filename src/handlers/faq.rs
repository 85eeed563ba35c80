//! Keyword-scored FAQ lookup.
//!
//! Scoring per query word: 3 for a hit in the question, 2 for a tag, 1 for
//! the answer. A query contained verbatim in a question adds 4.

use super::{DomainHandler, HandlerReply, HandlerRequest};
use crate::intent::Domain;

const QUESTION_WEIGHT: u32 = 3;
const TAG_WEIGHT: u32 = 2;
const PHRASE_BONUS: u32 = 4;
const ANSWER_WEIGHT: u32 = 1;

/// Minimum score for an entry to count as an answer.
const MIN_SCORE: u32 = 3;

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "can", "how", "what", "who", "does", "you", "are", "with", "from",
    "this", "that", "please", "need", "want", "our", "any", "about", "into", "have", "has",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaqEntry {
    pub question: String,
    pub answer: String,
    pub tags: Vec<String>,
}

impl FaqEntry {
    pub fn new(question: &str, answer: &str, tags: &[&str]) -> Self {
        Self {
            question: question.to_string(),
            answer: answer.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn score(&self, query: &str, words: &[String]) -> u32 {
        let question = self.question.to_lowercase();
        let answer = self.answer.to_lowercase();
        let mut score = 0;
        for word in words {
            if question.contains(word.as_str()) {
                score += QUESTION_WEIGHT;
            }
            if self.tags.iter().any(|t| t == word) {
                score += TAG_WEIGHT;
            }
            if answer.contains(word.as_str()) {
                score += ANSWER_WEIGHT;
            }
        }
        if !query.is_empty() && question.contains(query) {
            score += PHRASE_BONUS;
        }
        score
    }
}

/// Distinct significant lowercase words of `text`, sorted.
pub(crate) fn keywords(text: &str) -> Vec<String> {
    let mut words: Vec<String> = text
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 2 && !STOPWORDS.contains(w))
        .map(str::to_string)
        .collect();
    words.sort_unstable();
    words.dedup();
    words
}

#[derive(Debug, Clone)]
pub struct FaqBook {
    entries: Vec<FaqEntry>,
}

impl FaqBook {
    pub fn new(entries: Vec<FaqEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[FaqEntry] {
        &self.entries
    }

    /// Up to `limit` entries scoring at least the threshold, best first.
    pub fn search(&self, query: &str, limit: usize) -> Vec<(u32, &FaqEntry)> {
        let phrase = query.trim().to_lowercase();
        let words = keywords(query);
        let mut scored: Vec<_> = self
            .entries
            .iter()
            .map(|e| (e.score(&phrase, &words), e))
            .filter(|(score, _)| *score >= MIN_SCORE)
            .collect();
        // Stable sort keeps book order among equal scores.
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored.truncate(limit);
        scored
    }

    pub fn best(&self, query: &str) -> Option<&FaqEntry> {
        self.search(query, 1).into_iter().next().map(|(_, e)| e)
    }
}

impl Default for FaqBook {
    fn default() -> Self {
        Self::new(vec![
            FaqEntry::new(
                "How do I reset a user's password?",
                "Only a Company Admin can reset passwords. Open Users, click the three-dot menu next to the user and choose Reset Password. The user receives a link to set a new one.",
                &["password", "reset", "login", "admin"],
            ),
            FaqEntry::new(
                "How do I edit a user's details?",
                "Open Users, select the user and click Edit. You can change name, email, phone, role and department. Changes take effect the next time the user logs in.",
                &["edit", "update", "change", "details", "department"],
            ),
            FaqEntry::new(
                "What is the difference between blocking and deleting a user?",
                "Blocked users cannot log in but their account and history are kept, so they can be unblocked later. Deleted users are removed permanently and cannot be restored.",
                &["block", "blocked", "delete", "deleted", "remove", "restore"],
            ),
            FaqEntry::new(
                "How do I invite a new user?",
                "After creating the user, click Invite and choose WhatsApp, SMS or Email. The invitation contains a link to activate the account.",
                &["invite", "invitation", "whatsapp", "sms", "activate"],
            ),
            FaqEntry::new(
                "How do I change module permissions for a role?",
                "Go to Settings > Roles, pick the role and toggle modules such as Dashboard, Feedback, Guest Entry, Housekeeping, CRM, Service and Reports. Users with that role pick up the change on their next login.",
                &["permission", "permissions", "role", "roles", "module", "modules", "access"],
            ),
            FaqEntry::new(
                "What fields are required to create a user?",
                "First and last name plus either an email address or a phone number. Role, department and property are optional and default to staff.",
                &["required", "fields", "create", "new", "user"],
            ),
            FaqEntry::new(
                "How do I find a user?",
                "Use the search box on the Users page or filter by department, role or property. Results are paginated; change the page size at the bottom of the list.",
                &["find", "search", "filter", "locate"],
            ),
            FaqEntry::new(
                "How do I manage devices linked to an account?",
                "Open the user, go to the Devices tab and revoke any device you no longer trust. The device is signed out immediately.",
                &["device", "devices", "revoke", "phone", "tablet"],
            ),
            FaqEntry::new(
                "How do I raise a maintenance work order?",
                "Say \"open a work order\" with the service name and an optional priority (low, normal, high or urgent), or use Service > New Request in the app.",
                &["maintenance", "work", "order", "service", "request", "ticket"],
            ),
        ])
    }
}

impl DomainHandler for FaqBook {
    fn domain(&self) -> Domain {
        Domain::Faq
    }

    fn handle(&self, request: &HandlerRequest<'_>) -> HandlerReply {
        match self.best(request.text) {
            Some(entry) => HandlerReply::text(entry.answer.clone()),
            None => {
                let topics: Vec<_> = self.entries.iter().take(4).map(|e| e.question.as_str()).collect();
                HandlerReply::text(format!(
                    "I couldn't find that in the FAQ. Common questions:\n- {}",
                    topics.join("\n- ")
                ))
            }
        }
    }
}
