//! TEXT value escaping, shared by iCalendar and vCard.

/// Escapes a TEXT value: backslash, comma, semicolon and newline.
///
/// CR is dropped so CRLF and LF input both become `\n`.
#[must_use]
pub fn escape_text(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            ',' => result.push_str("\\,"),
            ';' => result.push_str("\\;"),
            '\n' => result.push_str("\\n"),
            '\r' => {}
            _ => result.push(c),
        }
    }
    result
}
