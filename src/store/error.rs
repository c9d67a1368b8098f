use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Cannot initialise log database at {path}: {source}")]
    StorageInit {
        path: PathBuf,
        #[source]
        source: InitCause,
    },

    #[error("Flush transaction failed and was rolled back: {0}")]
    Transaction(#[source] rusqlite::Error),

    #[error("Query failed: {0}")]
    Query(#[from] rusqlite::Error),

    #[error("Log store is closed")]
    Closed,
}

/// Underlying reason an open failed.
#[derive(Debug, Error)]
pub enum InitCause {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl StoreError {
    pub(crate) fn init(path: impl Into<PathBuf>, cause: impl Into<InitCause>) -> Self {
        StoreError::StorageInit {
            path: path.into(),
            source: cause.into(),
        }
    }

    /// Flush failures leave the buffer intact and can be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Transaction(_))
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
