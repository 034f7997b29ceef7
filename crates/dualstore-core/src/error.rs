//! Failure taxonomy
//!
//! Only [`FailureKind::PrimaryBackend`] crosses the facade boundary. The
//! others are absorbed into diff records or local logs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where in the dual-write pipeline a failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The authoritative adapter failed; fatal to the caller
    PrimaryBackend,
    /// The comparison-only adapter failed; becomes an ERROR diff
    ShadowBackend,
    /// The comparator failed; becomes an ERROR diff with a diagnostic
    Comparison,
    /// The diff store rejected a write; logged only
    Recording,
}

impl FailureKind {
    /// Whether this failure is returned to the domain caller
    #[inline]
    #[must_use]
    pub fn is_fatal(self) -> bool {
        matches!(self, Self::PrimaryBackend)
    }

    /// Whether this failure ends up in the diff log
    #[inline]
    #[must_use]
    pub fn is_recorded(self) -> bool {
        matches!(self, Self::ShadowBackend | Self::Comparison)
    }

    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PrimaryBackend => "primary_backend",
            Self::ShadowBackend => "shadow_backend",
            Self::Comparison => "comparison",
            Self::Recording => "recording",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
