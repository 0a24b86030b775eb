//! Utilities for sanitizing destination messages and table references.
//!
//! Removes control characters from server error messages before they are
//! carried in errors and logs, caps their length, and checks that a table
//! reference is safe to splice into an `INSERT` statement.

use crate::config::MAX_ERROR_MESSAGE_LENGTH;

/// Sanitizes an error message by removing control characters.
///
/// Control characters (0x00-0x1F, except newline/tab/carriage return) can cause
/// issues when displayed in logs. This function removes them while preserving
/// readability.
pub fn sanitize_error_message(message: &str) -> String {
    message
        .chars()
        .filter(|c| {
            let code = *c as u32;
            code >= 0x20 // Printable ASCII starts at 0x20 (space)
                || code == 0x09 // Tab
                || code == 0x0A // Newline
                || code == 0x0D // Carriage return
        })
        .collect()
}

/// Sanitizes, trims and truncates an error message to `MAX_ERROR_MESSAGE_LENGTH`.
///
/// Truncation happens on a character boundary and appends an indicator with
/// the original length.
pub fn sanitize_and_truncate_error_message(message: &str) -> String {
    let sanitized = sanitize_error_message(message.trim());

    if sanitized.len() <= MAX_ERROR_MESSAGE_LENGTH {
        return sanitized;
    }

    // Leave room for the truncation suffix
    let mut cut = MAX_ERROR_MESSAGE_LENGTH.saturating_sub(50);
    while !sanitized.is_char_boundary(cut) {
        cut -= 1;
    }
    format!(
        "{}... (truncated, original length: {} chars)",
        &sanitized[..cut],
        sanitized.len()
    )
}

/// Returns true if `table` is a plain or `database.table` identifier.
///
/// Each part must start with a letter or underscore and contain only ASCII
/// alphanumerics and underscores. Quoting is not supported.
pub fn is_valid_table_name(table: &str) -> bool {
    let mut parts = 0;
    for part in table.split('.') {
        parts += 1;
        let mut chars = part.chars();
        let starts_ok = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
        if !starts_ok || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return false;
        }
    }
    parts <= 2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_error_message_removes_control_chars() {
        let input = "Error\x00message\x01with\x02control\x03chars";
        let output = sanitize_error_message(input);
        assert_eq!(output, "Errormessagewithcontrolchars");
    }

    #[test]
    fn test_sanitize_error_message_preserves_newlines_and_unicode() {
        let input = "Code: 60.\nDB::Exception: Table default.évents doesn't exist";
        assert_eq!(sanitize_error_message(input), input);
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let input = "é".repeat(MAX_ERROR_MESSAGE_LENGTH);
        let output = sanitize_and_truncate_error_message(&input);
        assert!(output.len() < input.len());
        assert!(output.contains("truncated"));
    }

    #[test]
    fn test_short_message_is_only_trimmed() {
        assert_eq!(sanitize_and_truncate_error_message("  boom \n"), "boom");
    }

    #[test]
    fn test_table_names() {
        assert!(is_valid_table_name("events"));
        assert!(is_valid_table_name("analytics.events_v1"));
        assert!(is_valid_table_name("_tmp"));

        assert!(!is_valid_table_name(""));
        assert!(!is_valid_table_name("1events"));
        assert!(!is_valid_table_name("a.b.c"));
        assert!(!is_valid_table_name("events; DROP TABLE x"));
        assert!(!is_valid_table_name("events."));
        assert!(!is_valid_table_name("`events`"));
    }
}
