//! Cutover errors

use dualstore_core::CutoverPhase;
use std::path::PathBuf;

/// Errors from phase administration
///
/// `phase_for` never fails; these only come from the administrative path.
#[derive(Debug, thiserror::Error)]
pub enum CutoverError {
    /// Requested phase is behind the current one
    #[error("refusing to regress {domain}.{method} from {from} to {to}")]
    Regression {
        domain: String,
        method: String,
        from: CutoverPhase,
        to: CutoverPhase,
    },

    /// Domain or method empty
    #[error("invalid phase key: {0}")]
    InvalidKey(String),

    /// IO error reading or writing a phase file
    #[error("io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Phase file could not be parsed
    #[error("invalid phase file {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    /// Phase table could not be serialized
    #[error("could not serialize phase table: {0}")]
    Serialize(String),
}

impl CutoverError {
    /// Whether this error is a refused regression
    #[inline]
    #[must_use]
    pub fn is_regression(&self) -> bool {
        matches!(self, Self::Regression { .. })
    }

    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
