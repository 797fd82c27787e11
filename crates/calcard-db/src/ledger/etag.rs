//! `ETag` generation.

use sha2::{Digest, Sha256};

/// ## Summary
/// Computes the `ETag` of a resource's content.
///
/// The `ETag` is the hex-encoded SHA256 of the content, wrapped in quotes.
#[must_use]
pub fn etag_of(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("\"{}\"", hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_and_content_sensitive() {
        let a = "BEGIN:VCALENDAR\r\nEND:VCALENDAR\r\n";
        assert_eq!(etag_of(a), etag_of(a));
        assert_ne!(etag_of(a), etag_of("BEGIN:VCALENDAR\r\nEND:VCALENDAR\n"));
    }

    #[test]
    fn quoted_sha256_hex() {
        let etag = etag_of("");
        assert_eq!(
            etag,
            "\"e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855\""
        );
    }
}
