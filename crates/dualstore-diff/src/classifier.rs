//! Severity classification
//!
//! A static, versioned table keyed by (domain, field-path pattern). Rows for
//! domain `*` apply to every domain. Fields without a row default to
//! WARNING so that new fields are neither dropped nor escalated.

use crate::path::{normalize_str, pattern_matches, pattern_specificity, strip_element_prefix};
use dualstore_core::{DiffEntry, Operation, OperationKind, Severity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Domain key for rows that apply everywhere
pub const ANY_DOMAIN: &str = "*";

/// Version of the built-in rows
pub const TABLE_VERSION: u32 = 2;

/// Identifier field each backend mints for itself on create
pub const MINTED_ID_FIELD: &str = "id";

/// What a field means for correctness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldClass {
    /// Identity, state enums, money
    Critical,
    /// Counters, cached aggregates; expected to self-heal
    Derived,
    /// Timestamps and per-backend identifiers; audit only
    Volatile,
}

impl FieldClass {
    /// Severity a divergence in this class maps to
    #[inline]
    #[must_use]
    pub fn severity(self) -> Severity {
        match self {
            Self::Critical => Severity::Error,
            Self::Derived => Severity::Warning,
            Self::Volatile => Severity::Info,
        }
    }
}

impl fmt::Display for FieldClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Critical => "critical",
            Self::Derived => "derived",
            Self::Volatile => "volatile",
        })
    }
}

impl FromStr for FieldClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "critical" => Ok(Self::Critical),
            "derived" => Ok(Self::Derived),
            "volatile" => Ok(Self::Volatile),
            other => Err(format!("unknown field class: '{other}'")),
        }
    }
}

/// Versioned classification rows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationTable {
    /// Bumped whenever built-in rows change
    pub version: u32,
    /// domain → pattern → class
    rows: BTreeMap<String, BTreeMap<String, FieldClass>>,
}

impl Default for ClassificationTable {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl ClassificationTable {
    /// Empty table
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self {
            version: TABLE_VERSION,
            rows: BTreeMap::new(),
        }
    }

    /// Table with the domain-independent rows
    ///
    /// - `$` (whole record present on one side only) is critical
    /// - `id` is critical, except on CREATE where each backend mints its own
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::empty()
            .with_rule(ANY_DOMAIN, "$", FieldClass::Critical)
            .with_rule(ANY_DOMAIN, "id", FieldClass::Critical)
    }

    /// With a row
    #[inline]
    #[must_use]
    pub fn with_rule(
        mut self,
        domain: impl Into<String>,
        pattern: impl Into<String>,
        class: FieldClass,
    ) -> Self {
        self.insert(domain, pattern, class);
        self
    }

    /// With explicit version
    #[inline]
    #[must_use]
    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Add or replace a row
    pub fn insert(
        &mut self,
        domain: impl Into<String>,
        pattern: impl Into<String>,
        class: FieldClass,
    ) {
        self.rows
            .entry(domain.into())
            .or_default()
            .insert(pattern.into(), class);
    }

    /// Merge all rows of another table; `other` wins on conflicts
    pub fn extend(&mut self, other: &ClassificationTable) {
        for (domain, patterns) in &other.rows {
            for (pattern, class) in patterns {
                self.insert(domain.clone(), pattern.clone(), *class);
            }
        }
    }

    /// Total number of rows
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.values().map(BTreeMap::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Class for a normalized path in a domain, if any row matches
    ///
    /// Domain rows beat `*` rows; within each, the most specific pattern wins.
    #[must_use]
    pub fn lookup(&self, domain: &str, normalized: &str) -> Option<FieldClass> {
        let find = |domain: &str| {
            self.rows.get(domain).and_then(|patterns| {
                patterns
                    .iter()
                    .filter(|(pattern, _)| pattern_matches(pattern, normalized))
                    .max_by_key(|(pattern, _)| pattern_specificity(pattern))
                    .map(|(_, class)| *class)
            })
        };
        find(domain).or_else(|| find(ANY_DOMAIN))
    }
}

/// Maps a diff payload to a severity
///
/// Pure: the same operation and payload always give the same severity.
#[derive(Debug, Clone, Default)]
pub struct SeverityClassifier {
    table: Arc<ClassificationTable>,
}

impl SeverityClassifier {
    /// Create classifier over a table
    #[inline]
    #[must_use]
    pub fn new(table: ClassificationTable) -> Self {
        Self {
            table: Arc::new(table),
        }
    }

    /// Get table
    #[inline]
    #[must_use]
    pub fn table(&self) -> &ClassificationTable {
        &self.table
    }

    /// Severity of a single entry
    #[must_use]
    pub fn classify_entry(&self, operation: &Operation, entry: &DiffEntry) -> Severity {
        if entry.is_failure() {
            return Severity::Error;
        }
        let normalized = normalize_str(&entry.field_path);
        let key = strip_element_prefix(&normalized);
        if operation.kind == OperationKind::Create && key == MINTED_ID_FIELD {
            return FieldClass::Volatile.severity();
        }
        self.table
            .lookup(&operation.domain, key)
            .map_or(Severity::Warning, FieldClass::severity)
    }

    /// Severity of a whole payload: the maximum over its entries
    ///
    /// An empty payload is INFO.
    #[must_use]
    pub fn classify(&self, operation: &Operation, payload: &[DiffEntry]) -> Severity {
        payload
            .iter()
            .map(|entry| self.classify_entry(operation, entry))
            .max()
            .unwrap_or(Severity::Info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dualstore_core::{Backend, DiffValue, OperationKind};
    use serde_json::json;

    fn op(domain: &str) -> Operation {
        Operation::of_kind(domain, OperationKind::Read)
    }

    fn entry(path: &str) -> DiffEntry {
        DiffEntry::new(path, json!(1).into(), json!(2).into())
    }

    fn classifier() -> SeverityClassifier {
        SeverityClassifier::new(
            ClassificationTable::with_defaults()
                .with_rule("task", "status", FieldClass::Critical)
                .with_rule("task", "updated_at", FieldClass::Volatile)
                .with_rule("family", "member_count", FieldClass::Derived)
                .with_rule(ANY_DOMAIN, "updated_at", FieldClass::Critical)
                .with_rule("meal", "items[*].grams", FieldClass::Critical)
                .with_rule("meal", "debug.*", FieldClass::Volatile),
        )
    }

    #[test]
    fn unclassified_defaults_to_warning() {
        assert_eq!(
            classifier().classify(&op("task"), &[entry("balance")]),
            Severity::Warning
        );
    }

    #[test]
    fn domain_rows_beat_global_rows() {
        let c = classifier();
        assert_eq!(c.classify(&op("task"), &[entry("updated_at")]), Severity::Info);
        assert_eq!(c.classify(&op("family"), &[entry("updated_at")]), Severity::Error);
    }

    #[test]
    fn payload_severity_is_maximum() {
        let c = classifier();
        let payload = vec![entry("updated_at"), entry("notes"), entry("status")];
        assert_eq!(c.classify(&op("task"), &payload), Severity::Error);
        assert_eq!(c.classify(&op("task"), &payload[..2]), Severity::Warning);
    }

    #[test]
    fn empty_payload_is_info() {
        assert_eq!(classifier().classify(&op("task"), &[]), Severity::Info);
    }

    #[test]
    fn failures_are_errors() {
        let c = classifier();
        let unavailable =
            DiffEntry::backend_unavailable(Backend::Target, "connection reset", json!({}));
        assert_eq!(c.classify(&op("task"), &[unavailable]), Severity::Error);
        let broken = DiffEntry::incomparable("items", "no key");
        assert_eq!(c.classify(&op("meal"), &[broken]), Severity::Error);
    }

    #[test]
    fn list_elements_use_record_rows() {
        let c = classifier();
        assert_eq!(
            c.classify(&op("task"), &[entry("[id=7].status")]),
            Severity::Error
        );
        let missing = DiffEntry::new("[id=7]", json!({"id": 7}).into(), DiffValue::Missing);
        assert_eq!(c.classify(&op("task"), &[missing]), Severity::Error);
    }

    #[test]
    fn keyed_and_wildcard_patterns() {
        let c = classifier();
        assert_eq!(
            c.classify(&op("meal"), &[entry("items[food_id=3].grams")]),
            Severity::Error
        );
        assert_eq!(
            c.classify(&op("meal"), &[entry("debug.host")]),
            Severity::Info
        );
    }

    #[test]
    fn minted_ids_are_volatile_on_create() {
        let c = classifier();
        let create = Operation::of_kind("task", OperationKind::Create);
        assert_eq!(c.classify(&create, &[entry("id")]), Severity::Info);
        assert_eq!(c.classify(&create, &[entry("id"), entry("status")]), Severity::Error);
        assert_eq!(c.classify(&op("task"), &[entry("id")]), Severity::Error);
        assert_eq!(
            c.classify(&Operation::of_kind("task", OperationKind::Update), &[entry("[id=1].id")]),
            Severity::Error
        );
    }

    #[test]
    fn brackets_inside_keyed_values() {
        let c = classifier();
        let path = crate::path::FieldPath::root()
            .child(crate::path::Segment::Keyed {
                key: "id".into(),
                value: "a]b".into(),
            })
            .key("updated_at");
        assert_eq!(c.classify(&op("task"), &[entry(&path.to_string())]), Severity::Info);
    }

    #[test]
    fn extend_overrides_rows() {
        let mut table = ClassificationTable::with_defaults();
        table.extend(&ClassificationTable::empty().with_rule(ANY_DOMAIN, "id", FieldClass::Volatile));
        assert_eq!(table.lookup("x", "id"), Some(FieldClass::Volatile));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn field_class_parses() {
        assert_eq!("Derived".parse::<FieldClass>().unwrap(), FieldClass::Derived);
        assert!("fuzzy".parse::<FieldClass>().is_err());
    }
}
