//! Content line folding (RFC 5545 §3.1).

/// Maximum line length in octets, not counting CRLF.
const MAX_LINE_OCTETS: usize = 75;

/// Folds a content line to the 75-octet limit and terminates it with CRLF.
///
/// Continuation lines start with a single space. Splits only happen on
/// UTF-8 character boundaries.
#[must_use]
pub fn fold_line(line: &str) -> String {
    if line.len() <= MAX_LINE_OCTETS {
        return format!("{line}\r\n");
    }

    let mut result = String::with_capacity(line.len() + (line.len() / MAX_LINE_OCTETS) * 3 + 2);
    let mut rest = line;
    let mut first = true;

    while !rest.is_empty() {
        let budget = if first {
            MAX_LINE_OCTETS
        } else {
            MAX_LINE_OCTETS - 1
        };

        let mut end = budget.min(rest.len());
        while !rest.is_char_boundary(end) {
            end -= 1;
        }
        if end == 0 {
            // A single character wider than the budget cannot happen with
            // budget >= 4, but never loop forever.
            end = rest.chars().next().map_or(rest.len(), char::len_utf8);
        }

        if !first {
            result.push(' ');
        }
        result.push_str(&rest[..end]);
        result.push_str("\r\n");

        rest = &rest[end..];
        first = false;
    }

    result
}
