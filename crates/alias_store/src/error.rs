use std::path::PathBuf;

use thiserror::Error;

/// Expected failures returned by the validator, mutators and reconciliation.
///
/// Every message carries a stable keyword (`empty`, `letters`, `128`, `reserved`,
/// `not found`, `already exists`, `string`) that hosts may match on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AliasError {
    #[error("alias name cannot be empty")]
    EmptyName,

    #[error("alias name '{name}' must contain only letters, numbers, dashes, and underscores")]
    InvalidCharacters { name: String },

    #[error("alias name cannot exceed {max} characters (got {len})")]
    NameTooLong { len: usize, max: usize },

    #[error("'{name}' is a reserved alias name")]
    ReservedName { name: String },

    #[error("session path cannot be empty")]
    EmptySessionPath,

    #[error("alias '{name}' not found")]
    NotFound { name: String },

    #[error("alias '{name}' already exists")]
    AlreadyExists { name: String },

    #[error("title must be a string or null, got {found}")]
    InvalidTitleType { found: &'static str },

    #[error("failed to save aliases to {path}")]
    SaveFailed { path: PathBuf },

    #[error("failed to read the current time")]
    ClockUnavailable,
}

/// Storage faults raised while persisting the alias database.
#[derive(Debug, Error)]
pub enum AliasStoreError {
    #[error("I/O error while {operation} at {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse alias database {path}: {source}")]
    JsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("alias database {path} must be an object with an 'aliases' object")]
    InvalidShape { path: PathBuf },

    #[error("failed to serialize alias database for {path}: {source}")]
    JsonSerialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to format current UTC timestamp as RFC3339: {0}")]
    ClockFormat(#[source] time::error::Format),
}

impl AliasStoreError {
    #[must_use]
    pub fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    #[must_use]
    pub fn json_parse(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::JsonParse {
            path: path.into(),
            source,
        }
    }

    #[must_use]
    pub fn json_serialize(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::JsonSerialize {
            path: path.into(),
            source,
        }
    }
}
