//! UID checks shared by the calendar and contact builders.

use crate::error::{CoreError, CoreResult};

/// Check a client-supplied UID before it is written into a content line.
///
/// Returns the UID with surrounding whitespace removed.
///
/// ## Errors
/// Returns [`CoreError::ValidationError`] if the UID is empty or contains a
/// control character, which would break or inject content lines.
pub fn check_uid(uid: &str) -> CoreResult<&str> {
    let uid = uid.trim();
    if uid.is_empty() {
        return Err(CoreError::ValidationError("UID must not be empty".to_string()));
    }
    if uid.chars().any(char::is_control) {
        return Err(CoreError::ValidationError(format!(
            "UID {uid:?} contains control characters"
        )));
    }
    Ok(uid)
}
