//! Diff store errors

use std::path::PathBuf;

/// Errors from a [`DiffStore`](crate::DiffStore)
///
/// The recorder logs and counts these; they never reach a facade caller.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// IO error on the backing file
    #[error("io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Record could not be serialized
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Stored row could not be turned back into a record
    #[error("corrupt diff log row: {0}")]
    Corrupt(String),

    /// Store is not accepting requests
    #[error("diff store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
