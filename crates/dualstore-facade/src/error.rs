//! Facade and configuration errors

use dualstore_core::{AdapterError, Backend, FailureKind, OperationKind};
use std::path::PathBuf;

/// Error returned to a domain module
///
/// Only the primary backend's failures cross the facade; shadow, comparison
/// and recording failures end up in diff records or logs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FacadeError {
    /// The authoritative backend failed
    #[error("{backend} store failed: {source}")]
    Primary {
        backend: Backend,
        #[source]
        source: AdapterError,
    },

    /// An adapter answered with the wrong response variant
    #[error("expected a {expected} response, got {actual}")]
    UnexpectedResponse {
        expected: OperationKind,
        actual: OperationKind,
    },
}

impl FacadeError {
    /// Create primary-backend error
    #[inline]
    pub fn primary(backend: Backend, source: AdapterError) -> Self {
        Self::Primary { backend, source }
    }

    /// Backend that failed, if any
    #[must_use]
    pub fn backend(&self) -> Option<Backend> {
        match self {
            Self::Primary { backend, .. } => Some(*backend),
            Self::UnexpectedResponse { .. } => None,
        }
    }

    /// Underlying adapter error, if any
    #[must_use]
    pub fn adapter_error(&self) -> Option<&AdapterError> {
        match self {
            Self::Primary { source, .. } => Some(source),
            Self::UnexpectedResponse { .. } => None,
        }
    }

    /// Failure category
    ///
    /// A wrong response variant comes from the primary answering outside its
    /// contract, so it is a primary failure as well.
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Primary { .. } | Self::UnexpectedResponse { .. } => FailureKind::PrimaryBackend,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self.adapter_error(), Some(AdapterError::NotFound(_)))
    }
}

/// Errors loading or validating a [`MigrationConfig`](crate::MigrationConfig)
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config text is not valid TOML for this schema
    #[error("invalid configuration: {0}")]
    Parse(String),

    /// Config parsed but a value is unusable
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: String, reason: String },

    /// Phase file failed to load
    #[error(transparent)]
    Cutover(#[from] dualstore_cutover::CutoverError),
}

impl ConfigError {
    /// Create invalid-value error
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
