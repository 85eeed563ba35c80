//! Field helpers for structured logging

/// Truncate `text` to at most `max_chars` characters.
///
/// Cuts on a char boundary, so multi-byte input never panics. Appends `…`
/// when anything was removed.
///
/// ```
/// use helpdesk::logging::truncate_chars;
///
/// assert_eq!(truncate_chars("hello", 10), "hello");
/// assert_eq!(truncate_chars("hello world", 5), "hello…");
/// assert_eq!(truncate_chars("héllo", 2), "hé…");
/// ```
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}

/// Preview of a user message for routing events.
///
/// Returns None unless content logging is enabled; messages may contain
/// contact details.
pub fn message_preview(message: &str, enabled: bool) -> Option<String> {
    if !enabled {
        return None;
    }
    Some(truncate_chars(message.trim(), 80))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars_exact_length_untouched() {
        assert_eq!(truncate_chars("abcde", 5), "abcde");
    }

    #[test]
    fn test_truncate_chars_zero_budget() {
        assert_eq!(truncate_chars("abc", 0), "…");
        assert_eq!(truncate_chars("", 0), "");
    }

    #[test]
    fn test_truncate_chars_emoji_boundary() {
        let text = "🛎️ front desk";
        let truncated = truncate_chars(text, 1);
        assert_eq!(truncated, "🛎…");
    }

    #[test]
    fn test_message_preview_disabled() {
        assert_eq!(message_preview("John,john@hotel.com", false), None);
    }

    #[test]
    fn test_message_preview_enabled_truncates() {
        let long = "x".repeat(200);
        let preview = message_preview(&long, true).unwrap();
        assert_eq!(preview.chars().count(), 81);
    }
}
