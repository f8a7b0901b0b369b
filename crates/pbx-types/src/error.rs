use thiserror::Error;

/// Errors produced by type construction and validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("party id must not be empty")]
    EmptyPartyId,

    #[error("invalid path component {value:?}: {reason}")]
    InvalidComponent { value: String, reason: String },

    #[error("invalid entry token {value:?}: {reason}")]
    InvalidToken { value: String, reason: String },

    #[error("unknown direction {0:?}, expected \"incoming\" or \"outgoing\"")]
    UnknownDirection(String),
}
