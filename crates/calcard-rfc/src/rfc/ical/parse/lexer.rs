//! Content line lexer (RFC 5545 §3.1, shared with vCard).
//!
//! Handles line unfolding and tokenization of content lines.

use super::error::{ParseError, ParseErrorKind, ParseResult};

/// Splits input into logical content lines, merging folded continuations.
///
/// Handles both CRLF and bare LF line endings. Lines starting with SP/HTAB are
/// continuations of the previous line; unfolding removes the line break and
/// that single whitespace character. Blank lines are dropped. Each entry
/// carries the 1-based physical line number where the logical line starts.
#[must_use]
pub fn unfold_lines(input: &str) -> Vec<(usize, String)> {
    let mut lines: Vec<(usize, String)> = Vec::new();

    for (i, raw_line) in input.split('\n').enumerate() {
        let line = raw_line.strip_suffix('\r').unwrap_or(raw_line);
        if line.is_empty() {
            continue;
        }

        if let Some(continuation) = line.strip_prefix([' ', '\t']) {
            if let Some((_, prev)) = lines.last_mut() {
                prev.push_str(continuation);
            } else if !continuation.is_empty() {
                lines.push((i + 1, continuation.to_string()));
            }
        } else {
            lines.push((i + 1, line.to_string()));
        }
    }

    lines
}

/// Unfolds content lines and normalizes every line terminator to CRLF.
///
/// Lossless for well-formed input: only fold points and blank lines go away.
#[must_use]
pub fn unfold(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    for (_, line) in unfold_lines(input) {
        result.push_str(&line);
        result.push_str("\r\n");
    }
    result
}

/// A property parameter with one or more values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    /// Parameter name, uppercased.
    pub name: String,
    /// Values with surrounding quotes removed.
    pub values: Vec<String>,
}

impl Parameter {
    /// Returns the first value.
    #[must_use]
    pub fn value(&self) -> Option<&str> {
        self.values.first().map(String::as_str)
    }
}

/// A single unfolded content line: `name *(";" param) ":" value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentLine {
    /// Property name, uppercased.
    pub name: String,
    /// Parameters in order of appearance.
    pub params: Vec<Parameter>,
    /// Raw value text, still escaped.
    pub value: String,
}

impl ContentLine {
    /// Parses a single content line.
    ///
    /// ## Errors
    /// Returns an error if the line has no name, an invalid name character,
    /// a malformed parameter, an unclosed quote or no colon.
    pub fn parse(line: &str, line_num: usize) -> ParseResult<Self> {
        let name_end = line
            .find([';', ':'])
            .ok_or_else(|| ParseError::new(ParseErrorKind::MissingColon, line_num))?;

        if name_end == 0 {
            return Err(ParseError::new(
                ParseErrorKind::MissingPropertyName,
                line_num,
            ));
        }

        let name = &line[..name_end];
        if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(ParseError::new(ParseErrorKind::InvalidPropertyName, line_num)
                .with_context(name.to_string()));
        }

        let mut params = Vec::new();
        let mut rest = &line[name_end..];

        while let Some(after_semi) = rest.strip_prefix(';') {
            let (param, remaining) = parse_parameter(after_semi, line_num)?;
            params.push(param);
            rest = remaining;
        }

        let value = rest
            .strip_prefix(':')
            .ok_or_else(|| ParseError::new(ParseErrorKind::MissingColon, line_num))?;

        Ok(Self {
            name: name.to_ascii_uppercase(),
            params,
            value: value.to_string(),
        })
    }

    /// Returns the first value of the named parameter.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .and_then(Parameter::value)
    }

    /// Returns whether any value of the named parameter equals `value` (case-insensitive).
    #[must_use]
    pub fn has_param_value(&self, name: &str, value: &str) -> bool {
        self.params
            .iter()
            .filter(|p| p.name.eq_ignore_ascii_case(name))
            .flat_map(|p| p.values.iter())
            .flat_map(|v| v.split(','))
            .any(|v| v.trim().eq_ignore_ascii_case(value))
    }

    /// Returns the value with TEXT escapes resolved.
    #[must_use]
    pub fn text(&self) -> String {
        unescape_text(&self.value)
    }
}

/// Parses one `name=value[,value]` parameter, returning the rest of the line
/// starting at the next `;` or `:`.
fn parse_parameter(input: &str, line_num: usize) -> ParseResult<(Parameter, &str)> {
    let eq = input
        .find('=')
        .ok_or_else(|| ParseError::new(ParseErrorKind::InvalidParameter, line_num))?;
    let name = &input[..eq];
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(ParseError::new(ParseErrorKind::InvalidParameter, line_num)
            .with_context(name.to_string()));
    }

    let mut values = Vec::new();
    let mut rest = &input[eq + 1..];

    loop {
        if let Some(quoted) = rest.strip_prefix('"') {
            let close = quoted
                .find('"')
                .ok_or_else(|| ParseError::new(ParseErrorKind::UnclosedQuote, line_num))?;
            values.push(quoted[..close].to_string());
            rest = &quoted[close + 1..];
        } else {
            let end = rest.find([',', ';', ':']).unwrap_or(rest.len());
            values.push(rest[..end].to_string());
            rest = &rest[end..];
        }

        match rest.chars().next() {
            Some(',') => rest = &rest[1..],
            Some(';' | ':') => break,
            _ => return Err(ParseError::new(ParseErrorKind::MissingColon, line_num)),
        }
    }

    Ok((
        Parameter {
            name: name.to_ascii_uppercase(),
            values,
        },
        rest,
    ))
}

/// Resolves TEXT escapes (`\\`, `\;`, `\,`, `\n`/`\N`).
///
/// Unknown escape sequences are kept verbatim.
#[must_use]
pub fn unescape_text(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('n' | 'N') => result.push('\n'),
            Some(escaped @ ('\\' | ';' | ',')) => result.push(escaped),
            Some(other) => {
                result.push('\\');
                result.push(other);
            }
            None => result.push('\\'),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unfold_merges_continuations() {
        let input = "SUMMARY:Long\r\n  title\r\nUID:1\r\n";
        let lines = unfold_lines(input);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], (1, "SUMMARY:Long title".to_string()));
        assert_eq!(lines[1], (3, "UID:1".to_string()));
    }

    #[test]
    fn unfold_normalizes_bare_lf() {
        assert_eq!(unfold("A:1\nB:2\n\tx\n"), "A:1\r\nB:2x\r\n");
    }

    #[test]
    fn unfold_keeps_utf8_intact() {
        let input = "SUMMARY:日本\r\n 語\r\n";
        assert_eq!(unfold(input), "SUMMARY:日本語\r\n");
    }

    #[test]
    fn parse_simple_line() {
        let line = ContentLine::parse("summary:Team sync", 1).unwrap();
        assert_eq!(line.name, "SUMMARY");
        assert!(line.params.is_empty());
        assert_eq!(line.value, "Team sync");
    }

    #[test]
    fn parse_line_with_params() {
        let line =
            ContentLine::parse("DTSTART;TZID=Europe/Berlin;VALUE=DATE-TIME:20250106T100000", 1)
                .unwrap();
        assert_eq!(line.param("tzid"), Some("Europe/Berlin"));
        assert_eq!(line.param("VALUE"), Some("DATE-TIME"));
        assert_eq!(line.value, "20250106T100000");
    }

    #[test]
    fn parse_quoted_param_with_colon() {
        let line =
            ContentLine::parse("ATTENDEE;CN=\"Doe: Jane\";ROLE=CHAIR:mailto:jane@example.com", 4)
                .unwrap();
        assert_eq!(line.param("CN"), Some("Doe: Jane"));
        assert_eq!(line.value, "mailto:jane@example.com");
    }

    #[test]
    fn parse_multi_valued_param() {
        let line = ContentLine::parse("EMAIL;TYPE=INTERNET,PREF:a@example.com", 1).unwrap();
        assert!(line.has_param_value("TYPE", "pref"));
        assert!(!line.has_param_value("TYPE", "HOME"));
    }

    #[test]
    fn parse_errors() {
        assert_eq!(
            ContentLine::parse("NOCOLON", 3).unwrap_err().kind,
            ParseErrorKind::MissingColon
        );
        assert_eq!(
            ContentLine::parse(":value", 1).unwrap_err().kind,
            ParseErrorKind::MissingPropertyName
        );
        assert_eq!(
            ContentLine::parse("BAD NAME:x", 1).unwrap_err().kind,
            ParseErrorKind::InvalidPropertyName
        );
        assert_eq!(
            ContentLine::parse("X;CN=\"open:x", 1).unwrap_err().kind,
            ParseErrorKind::UnclosedQuote
        );
    }

    #[test]
    fn unescape_round() {
        assert_eq!(unescape_text("a\\, b\\; c\\\\d\\nE"), "a, b; c\\d\nE");
        assert_eq!(unescape_text("keep \\x"), "keep \\x");
    }
}
