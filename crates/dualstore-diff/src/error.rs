//! Comparator errors

/// Errors raised while comparing two results
///
/// These never reach a domain caller: the engine turns them into an ERROR
/// diff carrying the diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ComparisonError {
    /// Nesting deeper than the configured limit
    #[error("comparison depth exceeded at {path} (max {max_depth})")]
    DepthExceeded { path: String, max_depth: usize },

    /// Keyed-set element has no key field
    #[error("element at {path} has no '{key}' field")]
    MissingSetKey { path: String, key: String },

    /// Keyed-set has two elements with the same key
    #[error("duplicate '{key}={value}' in keyed set at {path}")]
    DuplicateSetKey {
        path: String,
        key: String,
        value: String,
    },

    /// A result could not be converted to JSON
    #[error("result not serializable: {0}")]
    Serialization(String),
}

impl ComparisonError {
    /// Path the failure refers to (`$` when not path-specific)
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::DepthExceeded { path, .. }
            | Self::MissingSetKey { path, .. }
            | Self::DuplicateSetKey { path, .. } => path,
            Self::Serialization(_) => "$",
        }
    }
}

impl From<serde_json::Error> for ComparisonError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
