//! Rule-based field extraction.
//!
//! [`extract`] pulls structured fields out of a raw message without any
//! model call. Matchers run in a fixed priority order:
//!
//! 1. Delimiter-separated input (comma, semicolon or pipe). When the part
//!    count equals the expected-field count and every typed slot has the
//!    right shape, parts map positionally. Otherwise, when one part is an
//!    email address, parts are mapped by shape.
//! 2. Free-text matchers per field (email, phone, labelled name, role
//!    vocabulary, labelled priority, labelled service name).
//! 3. Anything unmatched stays absent.
//!
//! Extraction is deterministic and total. Two different values for one
//! field leave that field absent and record it as a conflict.

mod patterns;

pub use patterns::normalize_typos;

use patterns::{
    canonical_priority, canonical_role, clean_service_name, digit_count, is_email,
    is_name_like, is_phone, role_slot, EMAIL, NAME_AFTER_USER, NAME_LABELLED, PHONE, PRIORITY,
    QUOTED, ROLE, SERVICE_LABELLED, SERVICE_MENTION,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Field vocabulary understood by the extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Name,
    Email,
    Phone,
    Role,
    ServiceName,
    Priority,
}

impl Field {
    /// Human-readable label used in prompts back to the user.
    pub fn label(&self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Email => "email",
            Field::Phone => "phone",
            Field::Role => "role",
            Field::ServiceName => "service name",
            Field::Priority => "priority",
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// "name", "name and email", "name, email and phone".
pub fn field_list(fields: &[Field]) -> String {
    match fields {
        [] => String::new(),
        [only] => only.label().to_string(),
        [init @ .., last] => format!(
            "{} and {}",
            init.iter().map(Field::label).collect::<Vec<_>>().join(", "),
            last.label()
        ),
    }
}

/// Which matcher produced the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionSource {
    #[default]
    Empty,
    Positional,
    Shape,
    FreeText,
}

/// Fields extracted from one message. Never mutated after creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractionResult {
    fields: BTreeMap<Field, String>,
    conflicts: BTreeSet<Field>,
    source: ExtractionSource,
}

impl ExtractionResult {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builder used by callers that already know a field value.
    pub fn with_field(mut self, field: Field, value: impl Into<String>) -> Self {
        self.fields.insert(field, value.into());
        if self.source == ExtractionSource::Empty {
            self.source = ExtractionSource::FreeText;
        }
        self
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }

    pub fn contains(&self, field: Field) -> bool {
        self.fields.contains_key(&field)
    }

    pub fn fields(&self) -> &BTreeMap<Field, String> {
        &self.fields
    }

    pub fn conflicts(&self) -> &BTreeSet<Field> {
        &self.conflicts
    }

    pub fn source(&self) -> ExtractionSource {
        self.source
    }

    /// Produced by the delimiter path (positional or shape mapping).
    pub fn is_structured(&self) -> bool {
        matches!(
            self.source,
            ExtractionSource::Positional | ExtractionSource::Shape
        )
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Conflicting values were seen for at least one field.
    pub fn is_ambiguous(&self) -> bool {
        !self.conflicts.is_empty()
    }

    /// Conflicting values were seen for one of `fields`.
    pub fn conflicts_with(&self, fields: &[Field]) -> bool {
        fields.iter().any(|f| self.conflicts.contains(f))
    }

    pub fn has_required_fields(&self, required: &[Field]) -> bool {
        has_required_fields(self, required)
    }

    /// Required fields not present, in the order given.
    pub fn missing(&self, required: &[Field]) -> Vec<Field> {
        required
            .iter()
            .copied()
            .filter(|f| !self.fields.contains_key(f))
            .collect()
    }
}

/// True when every field in `required` is present in `result`.
pub fn has_required_fields(result: &ExtractionResult, required: &[Field]) -> bool {
    required.iter().all(|f| result.fields.contains_key(f))
}

/// Extract fields from `raw`, using `expected` for positional mapping.
///
/// ```
/// use helpdesk::extract::{extract, Field};
///
/// let expected = [Field::Name, Field::Email, Field::Phone, Field::Role];
/// let result = extract("John Doe,john@hotel.com,555-1234,manager", &expected);
/// assert!(result.has_required_fields(&expected));
/// assert_eq!(result.get(Field::Role), Some("manager"));
/// ```
pub fn extract(raw: &str, expected: &[Field]) -> ExtractionResult {
    let text = raw.trim();
    if text.is_empty() {
        return ExtractionResult::empty();
    }

    if let Some(parts) = split_structured(text) {
        if let Some(result) = positional(&parts, expected) {
            tracing::trace!(fields = result.len(), "positional extraction");
            return result;
        }
        if let Some(result) = by_shape(&parts) {
            tracing::trace!(fields = result.len(), "shape extraction");
            return result;
        }
    }

    let result = free_text(&normalize_typos(text));
    tracing::trace!(
        fields = result.len(),
        conflicts = result.conflicts.len(),
        "free-text extraction"
    );
    result
}

/// Accumulates offered values, turning disagreement into a conflict.
#[derive(Default)]
struct Collector {
    fields: BTreeMap<Field, String>,
    conflicts: BTreeSet<Field>,
}

impl Collector {
    fn offer(&mut self, field: Field, value: String) {
        if self.conflicts.contains(&field) {
            return;
        }
        match self.fields.get(&field) {
            Some(existing) if existing.eq_ignore_ascii_case(&value) => {}
            Some(_) => {
                self.fields.remove(&field);
                self.conflicts.insert(field);
            }
            None => {
                self.fields.insert(field, value);
            }
        }
    }

    fn finish(self, source: ExtractionSource) -> ExtractionResult {
        let source = if self.fields.is_empty() && self.conflicts.is_empty() {
            ExtractionSource::Empty
        } else {
            source
        };
        ExtractionResult {
            fields: self.fields,
            conflicts: self.conflicts,
            source,
        }
    }
}

fn split_structured(text: &str) -> Option<Vec<&str>> {
    [',', ';', '|'].iter().find_map(|delim| {
        if !text.contains(*delim) {
            return None;
        }
        let parts: Vec<&str> = text
            .split(*delim)
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        (parts.len() >= 2).then_some(parts)
    })
}

fn positional(parts: &[&str], expected: &[Field]) -> Option<ExtractionResult> {
    if expected.is_empty() || parts.len() != expected.len() {
        return None;
    }

    let mut fields = BTreeMap::new();
    for (field, part) in expected.iter().zip(parts) {
        let value = match field {
            Field::Email if is_email(part) => part.to_lowercase(),
            Field::Phone if is_phone(part) => part.to_string(),
            Field::Name if is_name_like(part) => part.to_string(),
            Field::Priority => canonical_priority(part)?.to_string(),
            Field::Role => role_slot(part),
            Field::ServiceName => part.to_string(),
            _ => return None,
        };
        fields.insert(*field, value);
    }

    Some(ExtractionResult {
        fields,
        conflicts: BTreeSet::new(),
        source: ExtractionSource::Positional,
    })
}

fn by_shape(parts: &[&str]) -> Option<ExtractionResult> {
    if !parts.iter().any(|p| is_email(p)) {
        return None;
    }

    let mut collector = Collector::default();
    let mut labelled_names = Vec::new();
    let mut bare_names = Vec::new();
    for part in parts {
        if is_email(part) {
            collector.offer(Field::Email, part.to_lowercase());
        } else if is_phone(part) {
            collector.offer(Field::Phone, part.to_string());
        } else if let Some(role) = canonical_role(part) {
            collector.offer(Field::Role, role.to_string());
        } else if let Some(name) = labelled_name(part) {
            labelled_names.push(name);
        } else if is_name_like(part) {
            bare_names.push(part.to_string());
        }
    }

    // "hello, add user Jo Park, jo@hotel.com": a labelled name beats bare
    // words, and a single capitalised candidate beats lowercase chatter.
    let names = if !labelled_names.is_empty() {
        labelled_names
    } else if bare_names.len() > 1 {
        let capitalised: Vec<String> = bare_names
            .iter()
            .filter(|n| {
                n.split_whitespace()
                    .all(|w| w.chars().next().is_some_and(char::is_uppercase))
            })
            .cloned()
            .collect();
        if capitalised.is_empty() {
            bare_names
        } else {
            capitalised
        }
    } else {
        bare_names
    };
    for name in names {
        collector.offer(Field::Name, name);
    }

    Some(collector.finish(ExtractionSource::Shape))
}

fn free_text(text: &str) -> ExtractionResult {
    let mut collector = Collector::default();

    for m in EMAIL.find_iter(text) {
        collector.offer(Field::Email, m.as_str().to_lowercase());
    }

    let without_emails = EMAIL.replace_all(text, " ");
    for m in PHONE.find_iter(&without_emails) {
        let candidate = m.as_str().trim();
        if (7..=15).contains(&digit_count(candidate)) {
            collector.offer(Field::Phone, candidate.to_string());
        }
    }

    for caps in ROLE.captures_iter(text) {
        if let Some(role) = canonical_role(&caps[1]) {
            collector.offer(Field::Role, role.to_string());
        }
    }

    for caps in NAME_LABELLED
        .captures_iter(text)
        .chain(NAME_AFTER_USER.captures_iter(text))
    {
        if let Some(name) = trim_name(&caps[1]) {
            collector.offer(Field::Name, name);
        }
    }

    for caps in PRIORITY.captures_iter(text) {
        if let Some(level) = caps.get(1).or_else(|| caps.get(2)) {
            collector.offer(Field::Priority, level.as_str().to_lowercase());
        }
    }

    let mut labelled_service = false;
    for caps in SERVICE_LABELLED.captures_iter(text) {
        if let Some(name) = clean_service_name(&caps[1]) {
            labelled_service = true;
            collector.offer(Field::ServiceName, name);
        }
    }
    if !labelled_service && SERVICE_MENTION.is_match(text) {
        for caps in QUOTED.captures_iter(text) {
            collector.offer(Field::ServiceName, caps[1].trim().to_string());
        }
    }

    collector.finish(ExtractionSource::FreeText)
}

fn labelled_name(text: &str) -> Option<String> {
    NAME_LABELLED
        .captures(text)
        .or_else(|| NAME_AFTER_USER.captures(text))
        .and_then(|caps| trim_name(&caps[1]))
}

/// Drop trailing capitalised words that are labels or roles rather than
/// part of the name ("John Doe Manager", "Jane Roe Email").
fn trim_name(raw: &str) -> Option<String> {
    const STOP: &[&str] = &["email", "phone", "role", "with", "as", "and", "at"];
    let words: Vec<&str> = raw
        .split_whitespace()
        .take_while(|w| {
            let lower = w.to_lowercase();
            !STOP.contains(&lower.as_str()) && canonical_role(w).is_none()
        })
        .collect();
    if words.is_empty() {
        None
    } else {
        Some(words.join(" "))
    }
}
