//! Error types for sitetime-core operations.

use std::path::PathBuf;

/// All errors that can occur in sitetime-core operations.
///
/// None of these are fatal to the daemon: callers absorb them at the event
/// handler where they occur and wait for the next event.
#[derive(Debug, thiserror::Error)]
pub enum SitetimeError {
    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error("Database error: {context}: {source}")]
    Db {
        context: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON parsing error: {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Malformed timestamp in snapshot: {0}")]
    MalformedSnapshot(String),

    #[error("Config write failed: {path}: {source}")]
    ConfigWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SitetimeError {
    pub(crate) fn db(context: impl Into<String>) -> impl FnOnce(rusqlite::Error) -> Self {
        let context = context.into();
        move |source| SitetimeError::Db { context, source }
    }

    pub(crate) fn io(context: impl Into<String>) -> impl FnOnce(std::io::Error) -> Self {
        let context = context.into();
        move |source| SitetimeError::Io { context, source }
    }
}

/// Convenience type alias for Results using SitetimeError.
pub type Result<T> = std::result::Result<T, SitetimeError>;
