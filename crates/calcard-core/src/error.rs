use thiserror::Error;

/// Errors raised by settings and identifier checks shared across crates
#[derive(Error, Debug)]
pub enum CoreError {
    /// A loaded setting is out of range.
    #[error("Invalid setting {key}: {reason}")]
    ConfigError { key: &'static str, reason: String },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invariant violation: {0}")]
    InvariantViolation(&'static str),
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;
