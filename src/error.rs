use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures surfaced by [`PostStore`](crate::database::PostStore).
///
/// A missing data file is not an error; it is the empty guestbook.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("post log at {} is corrupt: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to read post log at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write post log at {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Reasons a submitted guestbook entry is turned away before reaching the store.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("name must not be empty")]
    EmptyName,

    #[error("text must not be empty")]
    EmptyText,

    #[error("name must be at most {max} characters")]
    NameTooLong { max: usize },

    #[error("text must be at most {max} characters")]
    TextTooLong { max: usize },

    #[error("missing field {0}")]
    MissingField(&'static str),

    #[error("malformed form body")]
    MalformedForm,
}
