//! Operation, phase and severity types
//!
//! These are the keys everything else is indexed by: the cutover table is
//! keyed by (domain, method), diff records carry an [`Operation`], and the
//! classifier reduces a diff to a [`Severity`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error parsing one of the textual enums in this module
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: '{value}'")]
pub struct ParseEnumError {
    /// Which enum was being parsed
    pub kind: &'static str,
    /// The rejected input
    pub value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Kind of logical operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OperationKind {
    Create,
    Read,
    Update,
    Delete,
    List,
}

impl OperationKind {
    /// All kinds, in declaration order
    pub const ALL: [OperationKind; 5] = [
        OperationKind::Create,
        OperationKind::Read,
        OperationKind::Update,
        OperationKind::Delete,
        OperationKind::List,
    ];

    /// Whether this kind mutates state
    #[inline]
    #[must_use]
    pub fn is_write(self) -> bool {
        matches!(self, Self::Create | Self::Update | Self::Delete)
    }

    /// Upper-case name as stored in the diff log
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Read => "READ",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::List => "LIST",
        }
    }

    /// Method name used when a caller does not supply one
    #[inline]
    #[must_use]
    pub fn default_method(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::List => "list",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OperationKind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseEnumError::new("operation kind", s))
    }
}

/// What was attempted, independent of backend
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Operation {
    /// Domain identifier, e.g. `family`
    pub domain: String,
    /// Method name, e.g. `update_status`
    pub method: String,
    /// Logical kind
    pub kind: OperationKind,
}

impl Operation {
    /// Create new operation
    #[inline]
    #[must_use]
    pub fn new(domain: impl Into<String>, method: impl Into<String>, kind: OperationKind) -> Self {
        Self {
            domain: domain.into(),
            method: method.into(),
            kind,
        }
    }

    /// Operation using the kind's default method name
    #[inline]
    #[must_use]
    pub fn of_kind(domain: impl Into<String>, kind: OperationKind) -> Self {
        Self::new(domain, kind.default_method(), kind)
    }

    /// `domain.method` context string (the diff log's `api_endpoint`)
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}.{}", self.domain, self.method)
    }

    #[inline]
    #[must_use]
    pub fn is_write(&self) -> bool {
        self.kind.is_write()
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}.{}", self.kind, self.domain, self.method)
    }
}

/// One of the two storage backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    Legacy,
    Target,
}

impl Backend {
    /// The other backend
    #[inline]
    #[must_use]
    pub fn other(self) -> Self {
        match self {
            Self::Legacy => Self::Target,
            Self::Target => Self::Legacy,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Legacy => "legacy",
            Self::Target => "target",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Migration stage for a (domain, method) pair
///
/// Ordered: a larger phase is further along the migration. Normal operation
/// only moves forward; see `CutoverController::set_phase`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum CutoverPhase {
    /// Legacy store only (fail-safe default)
    #[default]
    LegacyOnly,
    /// Both stores, legacy authoritative
    DualLegacyPrimary,
    /// Both stores, target authoritative
    DualTargetPrimary,
    /// Target store only
    TargetOnly,
}

impl CutoverPhase {
    /// All phases in migration order
    pub const ALL: [CutoverPhase; 4] = [
        CutoverPhase::LegacyOnly,
        CutoverPhase::DualLegacyPrimary,
        CutoverPhase::DualTargetPrimary,
        CutoverPhase::TargetOnly,
    ];

    /// Backend whose result is returned to the caller
    #[inline]
    #[must_use]
    pub fn primary(self) -> Backend {
        match self {
            Self::LegacyOnly | Self::DualLegacyPrimary => Backend::Legacy,
            Self::DualTargetPrimary | Self::TargetOnly => Backend::Target,
        }
    }

    /// Backend called for comparison only, if any
    #[inline]
    #[must_use]
    pub fn shadow(self) -> Option<Backend> {
        self.is_dual().then(|| self.primary().other())
    }

    /// Whether both backends are called
    #[inline]
    #[must_use]
    pub fn is_dual(self) -> bool {
        matches!(self, Self::DualLegacyPrimary | Self::DualTargetPrimary)
    }

    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LegacyOnly => "legacy_only",
            Self::DualLegacyPrimary => "dual_legacy_primary",
            Self::DualTargetPrimary => "dual_target_primary",
            Self::TargetOnly => "target_only",
        }
    }
}

impl fmt::Display for CutoverPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CutoverPhase {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        CutoverPhase::ALL
            .into_iter()
            .find(|p| p.as_str() == normalized)
            .ok_or_else(|| ParseEnumError::new("cutover phase", s))
    }
}

/// Operational importance of a detected diff
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Audit only (volatile fields)
    Info,
    /// Expected to self-heal (derived values)
    Warning,
    /// Correctness-critical divergence or backend failure
    Error,
}

impl Severity {
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "info" => Ok(Self::Info),
            "warning" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            _ => Err(ParseEnumError::new("severity", s)),
        }
    }
}
