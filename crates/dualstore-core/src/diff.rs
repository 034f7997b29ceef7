//! Diff payloads and records
//!
//! A [`ComparisonResult`] is transient and owned by the call that produced
//! it. A [`DiffRecord`] is what the recorder persists; it is never mutated
//! after creation.

use crate::types::{Backend, Operation, Severity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use ulid::Ulid;

/// One side of a divergent field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum DiffValue {
    /// Field absent on this side
    Missing,
    /// Field present with this value
    Present(Value),
    /// The backend call failed or timed out; carries the reason
    Unavailable(String),
    /// The comparator could not compare this path; carries the diagnostic
    Incomparable(String),
}

impl DiffValue {
    /// Whether this side signals a failure rather than data
    #[inline]
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Incomparable(_))
    }

    /// Present value, if any
    #[inline]
    #[must_use]
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Present(v) => Some(v),
            _ => None,
        }
    }
}

impl From<Value> for DiffValue {
    fn from(value: Value) -> Self {
        Self::Present(value)
    }
}

impl fmt::Display for DiffValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => f.write_str("<missing>"),
            Self::Present(v) => write!(f, "{v}"),
            Self::Unavailable(reason) => write!(f, "<unavailable: {reason}>"),
            Self::Incomparable(reason) => write!(f, "<incomparable: {reason}>"),
        }
    }
}

/// Divergence at a single leaf field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffEntry {
    /// Concrete field path, e.g. `items[food_id=7].grams`
    pub field_path: String,
    /// Legacy side
    pub legacy: DiffValue,
    /// Target side
    pub target: DiffValue,
}

impl DiffEntry {
    /// Create new entry
    #[inline]
    #[must_use]
    pub fn new(field_path: impl Into<String>, legacy: DiffValue, target: DiffValue) -> Self {
        Self {
            field_path: field_path.into(),
            legacy,
            target,
        }
    }

    /// Entry describing a backend that could not be reached
    ///
    /// `available` is what the other backend returned.
    #[must_use]
    pub fn backend_unavailable(failed: Backend, reason: impl Into<String>, available: Value) -> Self {
        let down = DiffValue::Unavailable(reason.into());
        let up = DiffValue::Present(available);
        match failed {
            Backend::Legacy => Self::new("$", down, up),
            Backend::Target => Self::new("$", up, down),
        }
    }

    /// Entry describing a comparator failure at `field_path`
    #[must_use]
    pub fn incomparable(field_path: impl Into<String>, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self::new(
            field_path,
            DiffValue::Incomparable(reason.clone()),
            DiffValue::Incomparable(reason),
        )
    }

    /// Whether either side signals a failure
    #[inline]
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.legacy.is_failure() || self.target.is_failure()
    }
}

impl fmt::Display for DiffEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} -> {}", self.field_path, self.legacy, self.target)
    }
}

/// Ordered sequence of field-level divergences
pub type DiffPayload = Vec<DiffEntry>;

/// Outcome of comparing legacy and target results
#[derive(Debug, Clone, PartialEq)]
pub enum ComparisonResult {
    /// Results agree
    Equivalent,
    /// Results disagree
    Divergent {
        payload: DiffPayload,
        severity: Severity,
    },
}

impl ComparisonResult {
    /// Create divergent result
    #[inline]
    #[must_use]
    pub fn divergent(payload: DiffPayload, severity: Severity) -> Self {
        Self::Divergent { payload, severity }
    }

    #[inline]
    #[must_use]
    pub fn is_equivalent(&self) -> bool {
        matches!(self, Self::Equivalent)
    }

    /// Severity, if divergent
    #[inline]
    #[must_use]
    pub fn severity(&self) -> Option<Severity> {
        match self {
            Self::Equivalent => None,
            Self::Divergent { severity, .. } => Some(*severity),
        }
    }
}

/// Unique diff record identifier (ULID for time ordering)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DiffRecordId(pub Ulid);

impl DiffRecordId {
    /// Generate new record ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for DiffRecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DiffRecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Persisted drift observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffRecord {
    pub id: DiffRecordId,
    pub domain: String,
    pub method: String,
    pub operation: Operation,
    pub severity: Severity,
    pub payload: DiffPayload,
    pub created_at: DateTime<Utc>,
}

impl DiffRecord {
    /// Build a record from a comparison, or `None` when equivalent
    #[must_use]
    pub fn from_comparison(operation: &Operation, comparison: ComparisonResult) -> Option<Self> {
        match comparison {
            ComparisonResult::Equivalent => None,
            ComparisonResult::Divergent { payload, severity } => Some(Self {
                id: DiffRecordId::new(),
                domain: operation.domain.clone(),
                method: operation.method.clone(),
                operation: operation.clone(),
                severity,
                payload,
                created_at: Utc::now(),
            }),
        }
    }

    /// With explicit timestamp
    #[inline]
    #[must_use]
    pub fn at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// `domain.method`
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}.{}", self.domain, self.method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OperationKind;
    use serde_json::json;

    #[test]
    fn equivalent_produces_no_record() {
        let op = Operation::of_kind("family", OperationKind::Read);
        assert!(DiffRecord::from_comparison(&op, ComparisonResult::Equivalent).is_none());
    }

    #[test]
    fn divergent_produces_record() {
        let op = Operation::new("task", "complete", OperationKind::Update);
        let payload = vec![DiffEntry::new(
            "status",
            json!("DONE").into(),
            json!("OPEN").into(),
        )];
        let record =
            DiffRecord::from_comparison(&op, ComparisonResult::divergent(payload, Severity::Error))
                .unwrap();
        assert_eq!(record.endpoint(), "task.complete");
        assert_eq!(record.severity, Severity::Error);
        assert_eq!(record.payload.len(), 1);
    }

    #[test]
    fn unavailable_side_is_oriented() {
        let entry = DiffEntry::backend_unavailable(Backend::Legacy, "timeout", json!({"id": "1"}));
        assert!(matches!(entry.legacy, DiffValue::Unavailable(_)));
        assert_eq!(entry.target.value(), Some(&json!({"id": "1"})));
        assert!(entry.is_failure());
    }

    #[test]
    fn diff_value_wire_shape() {
        let json = serde_json::to_value(DiffValue::Unavailable("down".into())).unwrap();
        assert_eq!(json, json!({"kind": "unavailable", "value": "down"}));
        let missing = serde_json::to_value(DiffValue::Missing).unwrap();
        assert_eq!(missing, json!({"kind": "missing"}));
    }
}
