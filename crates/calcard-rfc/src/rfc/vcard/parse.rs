use super::VCard;
use crate::error::{RfcError, RfcResult};
use crate::rfc::ical::parse::{ParseError, ParseErrorKind, unfold_lines};

/// Outcome of [`split_vcards`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SplitVcards {
    pub cards: Vec<VCard>,
    /// Entries dropped for unbalanced BEGIN/END or a missing name.
    pub malformed: usize,
    /// The first unbalanced boundary, for single-card callers.
    pub first_error: Option<ParseError>,
}

impl SplitVcards {
    fn reject(&mut self, error: ParseError) {
        tracing::warn!(%error, "Skipping malformed vCard entry");
        self.malformed += 1;
        if self.first_error.is_none() {
            self.first_error = Some(error);
        }
    }
}

fn marker<'a>(line: &'a str, keyword: &str) -> Option<&'a str> {
    let (name, value) = line.split_once(':')?;
    name.eq_ignore_ascii_case(keyword).then_some(value.trim())
}

/// ## Summary
/// Splits a multi-contact file on `BEGIN:VCARD` / `END:VCARD` boundaries.
///
/// Boundaries are found after unfolding. A BEGIN inside an open card, an END
/// without a BEGIN and a card still open at end of input each count as one
/// malformed entry, as does a card without FN or N. Well-formed cards are
/// returned in file order.
#[must_use]
pub fn split_vcards(text: &str) -> SplitVcards {
    let mut result = SplitVcards::default();
    let mut open: Option<(usize, Vec<String>)> = None;

    for (line_num, line) in unfold_lines(text) {
        if marker(&line, "BEGIN").is_some_and(|v| v.eq_ignore_ascii_case("VCARD")) {
            if let Some((start, _)) = open.take() {
                result.reject(
                    ParseError::new(ParseErrorKind::UnexpectedBegin, line_num)
                        .with_context(format!("VCARD opened at line {start} was never closed")),
                );
            }
            open = Some((line_num, Vec::new()));
            continue;
        }

        if marker(&line, "END").is_some_and(|v| v.eq_ignore_ascii_case("VCARD")) {
            match open.take() {
                Some((start, lines)) => {
                    let card = VCard::new(lines);
                    if card.validate().is_ok() {
                        result.cards.push(card);
                    } else {
                        tracing::warn!(line = start, "Skipping vCard without FN or N");
                        result.malformed += 1;
                    }
                }
                None => result.reject(
                    ParseError::new(ParseErrorKind::UnexpectedEnd, line_num)
                        .with_context("END:VCARD"),
                ),
            }
            continue;
        }

        match open.as_mut() {
            Some((_, lines)) => lines.push(line),
            None => tracing::trace!(line_num, "Ignoring line outside VCARD"),
        }
    }

    if let Some((start, _)) = open {
        result.reject(
            ParseError::new(ParseErrorKind::MissingEnd, start).with_context("VCARD"),
        );
    }

    result
}

/// ## Summary
/// Parses text holding exactly one VCARD.
///
/// ## Errors
/// Returns a parse error for unbalanced boundaries and a validation error
/// when the text holds no card, several cards or a card without a name.
pub fn parse_vcard(text: &str) -> RfcResult<VCard> {
    let split = split_vcards(text);
    if let Some(error) = split.first_error {
        return Err(RfcError::Parse(error));
    }
    if split.malformed > 0 {
        return Err(RfcError::validation("VCARD has neither FN nor N"));
    }

    let mut cards = split.cards;
    match cards.len() {
        1 => Ok(cards.remove(0)),
        0 => Err(RfcError::validation("no VCARD found")),
        n => Err(RfcError::validation(format!(
            "expected one VCARD, found {n}"
        ))),
    }
}
