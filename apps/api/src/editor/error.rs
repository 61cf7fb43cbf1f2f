use thiserror::Error;

/// Errors raised synchronously by a mutation. The document is never changed
/// when one of these is returned.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EditError {
    #[error("Malformed path '{path}': {reason}")]
    MalformedPath { path: String, reason: String },

    #[error("Path not found: {0}")]
    PathNotFound(String),

    #[error("Index {index} out of range for '{path}' (length {len})")]
    IndexOutOfRange {
        path: String,
        index: usize,
        len: usize,
    },

    #[error("No entry with id '{id}' in '{path}'")]
    EntryNotFound { path: String, id: String },

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

impl EditError {
    /// True for errors caused by a caller addressing a location that has
    /// since been removed or never existed. These are recovered locally.
    pub fn is_stale_address(&self) -> bool {
        matches!(
            self,
            EditError::PathNotFound(_)
                | EditError::IndexOutOfRange { .. }
                | EditError::EntryNotFound { .. }
        )
    }

    pub fn code(&self) -> &'static str {
        match self {
            EditError::MalformedPath { .. } => "MALFORMED_PATH",
            EditError::PathNotFound(_) => "PATH_NOT_FOUND",
            EditError::IndexOutOfRange { .. } => "INDEX_OUT_OF_RANGE",
            EditError::EntryNotFound { .. } => "ENTRY_NOT_FOUND",
            EditError::InvalidValue(_) => "INVALID_VALUE",
        }
    }
}
