pub mod ical;
pub mod vcard;
