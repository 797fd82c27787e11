//! Calendar resource serializer.

use super::fold::fold_line;
use crate::rfc::ical::core::{EventComponent, ParsedResource};

/// Serializes a resource, wrapping each component in `BEGIN:VEVENT` /
/// `END:VEVENT`. Every line is folded and terminated with CRLF.
#[must_use]
pub fn serialize(resource: &ParsedResource) -> String {
    let mut result = String::new();

    for line in &resource.header {
        result.push_str(&fold_line(line));
    }
    for component in &resource.components {
        serialize_component(component, &mut result);
    }
    for line in &resource.footer {
        result.push_str(&fold_line(line));
    }

    result
}

fn serialize_component(component: &EventComponent, out: &mut String) {
    out.push_str(&fold_line("BEGIN:VEVENT"));
    for line in &component.lines {
        out.push_str(&fold_line(line));
    }
    out.push_str(&fold_line("END:VEVENT"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rfc::ical::parse::parse;

    #[test]
    fn uses_crlf_and_wraps_components() {
        let text = "BEGIN:VCALENDAR\nVERSION:2.0\nBEGIN:VEVENT\nUID:a\nEND:VEVENT\nEND:VCALENDAR\n";
        let out = serialize(&parse(text).unwrap());
        assert_eq!(
            out,
            "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nBEGIN:VEVENT\r\nUID:a\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n"
        );
    }

    #[test]
    fn long_lines_are_folded() {
        let summary = format!("SUMMARY:{}", "x".repeat(120));
        let resource = ParsedResource::with_default_wrapper("-//Test//EN")
            .with_components(vec![EventComponent::new(vec!["UID:a".to_string(), summary.clone()])]);
        let out = serialize(&resource);
        assert!(out.lines().all(|l| l.trim_end_matches('\r').len() <= 75));
        assert_eq!(parse(&out).unwrap().components[0].lines[1], summary);
    }
}
