//! Structural comparison of legacy and target results
//!
//! Walks both JSON values in lockstep and emits one [`DiffEntry`] per
//! divergent leaf. Object keys are visited in sorted order and set residues
//! are sorted by canonical text, so identical inputs always produce identical
//! payloads.

use crate::error::ComparisonError;
use crate::path::{pattern_matches, pattern_specificity, FieldPath, Segment};
use dualstore_core::{DiffEntry, DiffPayload, DiffValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Default nesting limit
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// How a path is compared
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "rule", content = "key", rename_all = "snake_case")]
pub enum FieldRule {
    /// Null, missing and empty are all distinct
    #[default]
    Strict,
    /// Null and missing are equivalent
    NullEqualsMissing,
    /// Path is not compared
    Ignore,
    /// Array compared as a multiset
    Unordered,
    /// Array of objects matched by this key field
    KeyedBy(String),
}

/// Per-path comparator rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparatorConfig {
    /// Rules keyed by normalized path pattern
    #[serde(default)]
    pub rules: BTreeMap<String, FieldRule>,
    /// Maximum nesting depth before the comparison fails
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

impl Default for ComparatorConfig {
    fn default() -> Self {
        Self {
            rules: BTreeMap::new(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ComparatorConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With a rule for a path pattern
    #[inline]
    #[must_use]
    pub fn with_rule(mut self, pattern: impl Into<String>, rule: FieldRule) -> Self {
        self.rules.insert(pattern.into(), rule);
        self
    }

    /// With max depth
    #[inline]
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Most specific rule matching a normalized path
    #[must_use]
    pub fn rule_for(&self, normalized: &str) -> &FieldRule {
        static STRICT: FieldRule = FieldRule::Strict;
        self.rules
            .iter()
            .filter(|(pattern, _)| pattern_matches(pattern, normalized))
            .max_by_key(|(pattern, _)| pattern_specificity(pattern))
            .map_or(&STRICT, |(_, rule)| rule)
    }
}

/// Structural diff engine
#[derive(Debug, Clone, Default)]
pub struct DiffComparator {
    config: ComparatorConfig,
}

impl DiffComparator {
    /// Create comparator with rules
    #[inline]
    #[must_use]
    pub fn new(config: ComparatorConfig) -> Self {
        Self { config }
    }

    /// Get configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ComparatorConfig {
        &self.config
    }

    /// Compare two results
    ///
    /// # Returns
    /// An empty payload when the values are equivalent under the rules.
    ///
    /// # Errors
    /// - `DepthExceeded` if nesting exceeds `max_depth`
    /// - `MissingSetKey` / `DuplicateSetKey` for malformed keyed sets
    pub fn compare(&self, legacy: &Value, target: &Value) -> Result<DiffPayload, ComparisonError> {
        let mut out = DiffPayload::new();
        self.walk(&FieldPath::root(), Some(legacy), Some(target), &mut out)?;
        Ok(out)
    }

    fn walk(
        &self,
        path: &FieldPath,
        legacy: Option<&Value>,
        target: Option<&Value>,
        out: &mut DiffPayload,
    ) -> Result<(), ComparisonError> {
        if path.depth() > self.config.max_depth {
            return Err(ComparisonError::DepthExceeded {
                path: path.to_string(),
                max_depth: self.config.max_depth,
            });
        }

        let rule = self.config.rule_for(&path.normalized());
        match rule {
            FieldRule::Ignore => return Ok(()),
            FieldRule::NullEqualsMissing if is_absent(legacy) && is_absent(target) => {
                return Ok(())
            }
            _ => {}
        }

        match (legacy, target) {
            (None, None) => Ok(()),
            (Some(Value::Object(a)), Some(Value::Object(b))) => {
                let keys: BTreeSet<&String> = a.keys().chain(b.keys()).collect();
                for key in keys {
                    self.walk(&path.key(key.as_str()), a.get(key), b.get(key), out)?;
                }
                Ok(())
            }
            (Some(Value::Array(a)), Some(Value::Array(b))) => match rule {
                FieldRule::Unordered => {
                    compare_multiset(path, a, b, out);
                    Ok(())
                }
                FieldRule::KeyedBy(key) => self.compare_keyed(path, key, a, b, out),
                _ => {
                    for i in 0..a.len().max(b.len()) {
                        self.walk(&path.child(Segment::Index(i)), a.get(i), b.get(i), out)?;
                    }
                    Ok(())
                }
            },
            (l, t) => {
                if l != t {
                    out.push(DiffEntry::new(path.to_string(), side(l), side(t)));
                }
                Ok(())
            }
        }
    }

    fn compare_keyed(
        &self,
        path: &FieldPath,
        key: &str,
        legacy: &[Value],
        target: &[Value],
        out: &mut DiffPayload,
    ) -> Result<(), ComparisonError> {
        let legacy = index_by_key(path, key, legacy)?;
        let target = index_by_key(path, key, target)?;
        let ids: BTreeSet<&String> = legacy.keys().chain(target.keys()).collect();
        for id in ids {
            let child = path.child(Segment::Keyed {
                key: key.to_string(),
                value: id.clone(),
            });
            self.walk(&child, legacy.get(id).copied(), target.get(id).copied(), out)?;
        }
        Ok(())
    }
}

fn is_absent(value: Option<&Value>) -> bool {
    matches!(value, None | Some(Value::Null))
}

fn side(value: Option<&Value>) -> DiffValue {
    value.map_or(DiffValue::Missing, |v| DiffValue::Present(v.clone()))
}

fn index_by_key<'a>(
    path: &FieldPath,
    key: &str,
    elements: &'a [Value],
) -> Result<BTreeMap<String, &'a Value>, ComparisonError> {
    let mut index = BTreeMap::new();
    for element in elements {
        let id = match element.get(key) {
            Some(Value::String(s)) => s.clone(),
            Some(other) if !other.is_null() => other.to_string(),
            _ => {
                return Err(ComparisonError::MissingSetKey {
                    path: path.to_string(),
                    key: key.to_string(),
                })
            }
        };
        if index.insert(id.clone(), element).is_some() {
            return Err(ComparisonError::DuplicateSetKey {
                path: path.to_string(),
                key: key.to_string(),
                value: id,
            });
        }
    }
    Ok(index)
}

/// Multiset difference; residues reported at `path[*]`
fn compare_multiset(path: &FieldPath, legacy: &[Value], target: &[Value], out: &mut DiffPayload) {
    let mut counts: BTreeMap<String, (usize, usize, &Value)> = BTreeMap::new();
    for v in legacy {
        counts.entry(canonical(v)).or_insert((0, 0, v)).0 += 1;
    }
    for v in target {
        counts.entry(canonical(v)).or_insert((0, 0, v)).1 += 1;
    }

    let element = path.child(Segment::Element).to_string();
    for (l, t, value) in counts.into_values() {
        for _ in t..l {
            out.push(DiffEntry::new(
                element.clone(),
                DiffValue::Present(value.clone()),
                DiffValue::Missing,
            ));
        }
        for _ in l..t {
            out.push(DiffEntry::new(
                element.clone(),
                DiffValue::Missing,
                DiffValue::Present(value.clone()),
            ));
        }
    }
}

/// JSON text with object keys sorted at every level
#[must_use]
pub fn canonical(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<&String, String> =
                map.iter().map(|(k, v)| (k, canonical(v))).collect();
            let body: Vec<String> = sorted
                .into_iter()
                .map(|(k, v)| format!("{}:{v}", Value::String(k.clone())))
                .collect();
            format!("{{{}}}", body.join(","))
        }
        Value::Array(items) => {
            let body: Vec<String> = items.iter().map(canonical).collect();
            format!("[{}]", body.join(","))
        }
        other => other.to_string(),
    }
}
