//! Store adapter contract
//!
//! One implementation per backend per domain. The facade depends only on
//! this trait, never on backend-specific query syntax.

use crate::domain::Domain;
use crate::types::Backend;
use async_trait::async_trait;

/// Errors returned by a backend
///
/// Cloneable so a single failure can be both returned to the caller and
/// described in a diff record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdapterError {
    /// Record does not exist (for update/delete)
    #[error("not found: {0}")]
    NotFound(String),

    /// Network or connection failure
    #[error("network error: {0}")]
    Network(String),

    /// Backend did not answer in time
    #[error("backend timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Backend rejected the input
    #[error("rejected: {0}")]
    Rejected(String),

    /// Conflicting concurrent write
    #[error("conflict: {0}")]
    Conflict(String),

    /// Anything else the backend reports
    #[error("backend error: {0}")]
    Backend(String),
}

impl AdapterError {
    /// Whether the adapter itself might succeed on retry
    ///
    /// This layer never retries; the flag is for adapters and callers.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Timeout { .. } | Self::Conflict(_))
    }

    /// Create network error
    #[inline]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Create not-found error
    #[inline]
    pub fn not_found(id: impl std::fmt::Display) -> Self {
        Self::NotFound(id.to_string())
    }
}

/// Executes logical operations against one storage backend
#[async_trait]
pub trait StoreAdapter<D: Domain>: Send + Sync + std::fmt::Debug {
    /// Which backend this adapter talks to
    fn backend(&self) -> Backend;

    /// Insert a new record
    async fn create(&self, draft: D::Draft) -> Result<D::Record, AdapterError>;

    /// Fetch a record; `Ok(None)` when absent
    async fn read(&self, id: &D::Id) -> Result<Option<D::Record>, AdapterError>;

    /// Apply a patch and return the updated record
    async fn update(&self, id: &D::Id, patch: D::Patch) -> Result<D::Record, AdapterError>;

    /// Remove a record
    async fn delete(&self, id: &D::Id) -> Result<(), AdapterError>;

    /// Records matching a query
    async fn list(&self, query: &D::Query) -> Result<Vec<D::Record>, AdapterError>;
}
