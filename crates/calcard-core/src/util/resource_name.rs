//! Resource name generation.
//!
//! ## Summary
//! A resource name is the URL path segment of a calendar object or contact.
//! It is derived from the UID once, at creation, and never recomputed: a later
//! rename may move it away from the UID without affecting UID matching.

use crate::types::ResourceType;

/// Characters allowed verbatim in a resource name besides ASCII alphanumerics.
const SAFE_PUNCTUATION: &[char] = &['-', '_', '.', '@'];

/// Generate the path segment for a new resource from its UID.
///
/// Unsafe characters are replaced by hyphens, runs of hyphens are collapsed
/// and the extension for `resource_type` is appended. A UID with no usable
/// characters falls back to a random UUID.
///
/// Examples:
/// - `"evt1"` -> `"evt1.ics"`
/// - `"a b/c"` -> `"a-b-c.ics"`
/// - `"john@example.com"` (contact) -> `"john@example.com.vcf"`
#[must_use]
pub fn resource_name_for(uid: &str, resource_type: ResourceType) -> String {
    let stem = uid
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || SAFE_PUNCTUATION.contains(&c) {
                c
            } else {
                '-'
            }
        })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");

    let stem = stem.trim_matches('.');
    let stem = if stem.is_empty() {
        uuid::Uuid::new_v4().to_string()
    } else {
        stem.to_string()
    };

    format!("{stem}.{}", resource_type.extension())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_uid() {
        assert_eq!(resource_name_for("evt1", ResourceType::Calendar), "evt1.ics");
    }

    #[test]
    fn contact_extension() {
        assert_eq!(
            resource_name_for("john@example.com", ResourceType::Contact),
            "john@example.com.vcf"
        );
    }

    #[test]
    fn unsafe_characters_collapse() {
        assert_eq!(
            resource_name_for("a b//c", ResourceType::Calendar),
            "a-b-c.ics"
        );
    }

    #[test]
    fn dot_only_uid_falls_back_to_uuid() {
        let name = resource_name_for("...", ResourceType::Calendar);
        let stem = name.trim_end_matches(".ics");
        assert!(uuid::Uuid::parse_str(stem).is_ok());
    }
}
