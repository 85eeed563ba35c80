//! Fixed matchers used by the extractor.

use regex::Regex;
use std::sync::LazyLock;

pub(crate) static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap());

static EMAIL_EXACT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").unwrap());

pub(crate) static PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\+?\d[\d\s().-]{5,18}\d").unwrap());

static PHONE_EXACT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[\d\s().-]+$").unwrap());

pub(crate) static ROLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(front[ _-]?desk|manager|supervisor|housekeep(?:ing|er)|maintenance|security|admin(?:istrator)?|staff|concierge|receptionist)\b",
    )
    .unwrap()
});

pub(crate) static NAME_LABELLED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:(?i:name\s+is|named|name\s*:))\s+([A-Z][A-Za-z'-]+(?:\s+[A-Z][A-Za-z'-]+){0,3})",
    )
    .unwrap()
});

pub(crate) static NAME_AFTER_USER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i:\buser)\s+(?:(?i:for|called)\s+)?([A-Z][A-Za-z'-]+(?:\s+[A-Z][A-Za-z'-]+){0,3})",
    )
    .unwrap()
});

pub(crate) static PRIORITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:(urgent|high|medium|normal|low)\s+prio(?:rity)?|prio(?:rity)?\s*(?:is|:|=|of)?\s*(urgent|high|medium|normal|low))\b",
    )
    .unwrap()
});

pub(crate) static SERVICE_LABELLED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i:service|work\s+order|ticket|request)\s+(?i:called|named|titled|for)\s+"?([A-Za-z0-9][^",.;|!?"]{1,60})"#,
    )
    .unwrap()
});

static SERVICE_TAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s+(?:with|at|in|priority|urgent|high|medium|normal|low)\b.*$").unwrap()
});

pub(crate) static QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"]{2,60})""#).unwrap());

pub(crate) static SERVICE_MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(service|work\s+order|ticket)s?\b").unwrap());

static TYPOS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(usr|usre|uesr|srvice|sevice|servce|serivce|managment|manaegment|mangement|delte|dleete|creat|craete|emial|emal|pasword)\b",
    )
    .unwrap()
});

const PRIORITIES: &[&str] = &["urgent", "high", "medium", "normal", "low"];

/// Replace common misspellings of domain keywords.
///
/// ```
/// use helpdesk::extract::normalize_typos;
///
/// assert_eq!(normalize_typos("add usr to srvice managment"), "add user to service management");
/// ```
pub fn normalize_typos(text: &str) -> String {
    TYPOS
        .replace_all(text, |caps: &regex::Captures<'_>| {
            match caps[1].to_lowercase().as_str() {
                "usr" | "usre" | "uesr" => "user",
                "srvice" | "sevice" | "servce" | "serivce" => "service",
                "managment" | "manaegment" | "mangement" => "management",
                "delte" | "dleete" => "delete",
                "creat" | "craete" => "create",
                "emial" | "emal" => "email",
                _ => "password",
            }
            .to_string()
        })
        .into_owned()
}

pub(crate) fn is_email(text: &str) -> bool {
    EMAIL_EXACT.is_match(text.trim())
}

pub(crate) fn is_phone(text: &str) -> bool {
    let text = text.trim();
    PHONE_EXACT.is_match(text) && (7..=15).contains(&digit_count(text))
}

pub(crate) fn digit_count(text: &str) -> usize {
    text.chars().filter(char::is_ascii_digit).count()
}

/// Canonical snake_case role for a vocabulary match.
pub(crate) fn canonical_role(text: &str) -> Option<&'static str> {
    let lower = text.trim().to_lowercase();
    let squashed: String = lower
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .collect();
    let role = match squashed.as_str() {
        "frontdesk" => "front_desk",
        "manager" => "manager",
        "supervisor" => "supervisor",
        "housekeeping" | "housekeeper" => "housekeeping",
        "maintenance" => "maintenance",
        "security" => "security",
        "admin" | "administrator" => "admin",
        "staff" => "staff",
        "concierge" => "concierge",
        "receptionist" => "receptionist",
        _ => return None,
    };
    Some(role)
}

/// Role value for a positional slot: known roles are canonicalised, anything
/// else is kept in snake_case.
pub(crate) fn role_slot(text: &str) -> String {
    match canonical_role(text) {
        Some(role) => role.to_string(),
        None => text
            .split_whitespace()
            .map(str::to_lowercase)
            .collect::<Vec<_>>()
            .join("_"),
    }
}

pub(crate) fn canonical_priority(text: &str) -> Option<&'static str> {
    let lower = text.trim().to_lowercase();
    PRIORITIES.iter().copied().find(|p| *p == lower)
}

/// Name-like part: letters with at most four words, no digits or `@`.
pub(crate) fn is_name_like(text: &str) -> bool {
    let text = text.trim();
    let words = text.split_whitespace().count();
    (1..=4).contains(&words)
        && text.chars().any(char::is_alphabetic)
        && text
            .chars()
            .all(|c| c.is_alphabetic() || c.is_whitespace() || c == '\'' || c == '-' || c == '.')
}

/// Trim trailing qualifiers off a labelled service name.
pub(crate) fn clean_service_name(raw: &str) -> Option<String> {
    let cleaned = SERVICE_TAIL.replace(raw.trim(), "");
    let cleaned = cleaned.trim().trim_matches('"').trim();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}
