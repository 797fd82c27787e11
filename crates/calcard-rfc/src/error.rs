use thiserror::Error;

use crate::rfc::ical::parse::ParseError;

/// RFC parsing, validation and editing errors
#[derive(Error, Debug)]
pub enum RfcError {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Excluding an occurrence of a resource that has neither a matching
    /// override nor a master component.
    #[error("No master component for UID '{uid}'")]
    NoMaster { uid: String },

    #[error(transparent)]
    CoreError(#[from] calcard_core::error::CoreError),
}

impl RfcError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

pub type RfcResult<T> = std::result::Result<T, RfcError>;
