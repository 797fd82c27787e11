use calcard_core::util::uid::check_uid;

use super::{Birthday, VCard};
use crate::error::{RfcError, RfcResult};
use crate::rfc::ical::build::{escape_text, fold_line, normalize_mailto};

/// The editable fields of one contact.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContactFields {
    pub uid: String,
    pub formatted_name: Option<String>,
    pub family_name: Option<String>,
    pub given_name: Option<String>,
    pub emails: Vec<String>,
    pub phones: Vec<String>,
    pub organization: Option<String>,
    pub birthday: Option<Birthday>,
    pub note: Option<String>,
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

/// ## Summary
/// Builds a vCard 3.0 from contact fields.
///
/// FN falls back to `given family` when no formatted name is given. The
/// first valid email is marked preferred. Invalid emails are dropped.
///
/// ## Errors
/// Returns a validation error for an empty UID or one holding control
/// characters, and when no name is given.
pub fn build_vcard(fields: &ContactFields) -> RfcResult<VCard> {
    let uid = check_uid(&fields.uid)?;

    let family = non_empty(fields.family_name.as_ref()).unwrap_or_default();
    let given = non_empty(fields.given_name.as_ref()).unwrap_or_default();
    let formatted = match non_empty(fields.formatted_name.as_ref()) {
        Some(name) => name.to_string(),
        None => [given, family]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
    };
    if formatted.is_empty() {
        return Err(RfcError::validation("contact needs a formatted or structured name"));
    }

    let mut lines = vec![
        "VERSION:3.0".to_string(),
        format!("UID:{uid}"),
        format!("FN:{}", escape_text(&formatted)),
        format!("N:{};{};;;", escape_text(family), escape_text(given)),
    ];

    let mut preferred = true;
    for email in &fields.emails {
        let Some(mailto) = normalize_mailto(email) else {
            tracing::debug!(email, "Dropping invalid contact email");
            continue;
        };
        let address = mailto.trim_start_matches("mailto:");
        let types = if preferred { "INTERNET,PREF" } else { "INTERNET" };
        lines.push(format!("EMAIL;TYPE={types}:{address}"));
        preferred = false;
    }

    for phone in fields.phones.iter().map(|p| p.trim()).filter(|p| !p.is_empty()) {
        lines.push(format!("TEL;TYPE=VOICE:{}", escape_text(phone)));
    }

    if let Some(org) = non_empty(fields.organization.as_ref()) {
        lines.push(format!("ORG:{}", escape_text(org)));
    }
    if let Some(birthday) = fields.birthday {
        lines.push(format!("BDAY:{birthday}"));
    }
    if let Some(note) = non_empty(fields.note.as_ref()) {
        lines.push(format!("NOTE:{}", escape_text(note)));
    }

    Ok(VCard::new(lines))
}

/// Serializes a card with CRLF line endings and folding.
#[must_use]
pub fn serialize_vcard(card: &VCard) -> String {
    let mut output = fold_line("BEGIN:VCARD");
    for line in &card.lines {
        output.push_str(&fold_line(line));
    }
    output.push_str(&fold_line("END:VCARD"));
    output
}

#[cfg(test)]
mod tests {
    use calcard_core::error::CoreError;

    use super::*;
    use crate::rfc::vcard::parse_vcard;

    fn fields() -> ContactFields {
        ContactFields {
            uid: "c1".to_string(),
            given_name: Some("Jane".to_string()),
            family_name: Some("Doe".to_string()),
            emails: vec![
                "not-an-email".to_string(),
                "jane@example.com".to_string(),
                "j.doe@work.example".to_string(),
            ],
            phones: vec!["+1 555 0100".to_string()],
            organization: Some("Acme, Inc.".to_string()),
            birthday: Birthday::parse("--04-12"),
            note: Some("Met at conf; likes tea".to_string()),
            ..ContactFields::default()
        }
    }

    #[test]
    fn builds_version_three_card() {
        let card = build_vcard(&fields()).unwrap();
        assert_eq!(
            card.lines,
            vec![
                "VERSION:3.0",
                "UID:c1",
                "FN:Jane Doe",
                "N:Doe;Jane;;;",
                "EMAIL;TYPE=INTERNET,PREF:jane@example.com",
                "EMAIL;TYPE=INTERNET:j.doe@work.example",
                "TEL;TYPE=VOICE:+1 555 0100",
                "ORG:Acme\\, Inc.",
                "BDAY:--04-12",
                "NOTE:Met at conf\\; likes tea",
            ]
        );
    }

    #[test]
    fn serialized_card_parses_back() {
        let card = build_vcard(&fields()).unwrap();
        let text = serialize_vcard(&card);
        assert!(text.starts_with("BEGIN:VCARD\r\n"));
        assert!(text.ends_with("END:VCARD\r\n"));

        let parsed = parse_vcard(&text).unwrap();
        assert_eq!(parsed, card);
        let display = parsed.display();
        assert_eq!(display.display_name.as_deref(), Some("Jane Doe"));
        assert_eq!(display.primary_email.as_deref(), Some("jane@example.com"));
        assert_eq!(display.birthday, Birthday::parse("--04-12"));
        assert_eq!(
            parsed.property("NOTE").unwrap().text(),
            "Met at conf; likes tea"
        );
    }

    #[test]
    fn requires_uid_and_name() {
        for uid in ["", "c1\nEMAIL:eve@example.com"] {
            let mut bad_uid = fields();
            bad_uid.uid = uid.to_string();
            assert!(matches!(
                build_vcard(&bad_uid),
                Err(RfcError::CoreError(CoreError::ValidationError(_)))
            ));
        }

        let nameless = ContactFields {
            uid: "c2".to_string(),
            ..ContactFields::default()
        };
        assert!(matches!(build_vcard(&nameless), Err(RfcError::Validation(_))));
    }
}
