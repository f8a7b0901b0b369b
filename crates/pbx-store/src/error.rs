use std::io;
use std::path::PathBuf;

use pbx_types::TypeError;

/// Errors from store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// An underlying create/read/write/rename/delete/list call failed.
    #[error("could not {op} '{}': {source}", .path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The requested object does not exist.
    #[error("not found: '{}'", .path.display())]
    NotFound { path: PathBuf },

    /// Pop was called on a queue with no entries.
    #[error("nothing to pop from '{}'", .path.display())]
    EmptyQueue { path: PathBuf },

    /// Entries were listed, but concurrent pops claimed every one of them
    /// before this pop could.
    #[error("every entry in '{}' was claimed by a concurrent pop", .path.display())]
    ClaimLost { path: PathBuf },

    /// A self-addressed operation was called on a store without identity.
    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    /// A party id, object name or queue name is not a safe path component.
    #[error("invalid name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },

    /// The token source produced a token that already names an entry.
    #[error("entry token already exists: '{}'", .path.display())]
    TokenCollision { path: PathBuf },
}

impl StoreError {
    /// Build a closure mapping an `io::Error` into [`StoreError::Io`].
    pub(crate) fn io(op: &'static str, path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { op, path, source }
    }

    /// Returns `true` for [`StoreError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` for [`StoreError::EmptyQueue`].
    pub fn is_empty_queue(&self) -> bool {
        matches!(self, Self::EmptyQueue { .. })
    }
}

impl From<TypeError> for StoreError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::InvalidComponent { value, reason } => Self::InvalidName { name: value, reason },
            TypeError::InvalidToken { value, reason } => Self::InvalidName { name: value, reason },
            other => Self::InvalidName {
                name: String::new(),
                reason: other.to_string(),
            },
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
