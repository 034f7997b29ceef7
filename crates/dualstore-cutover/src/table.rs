//! Phase table
//!
//! An immutable map from (domain, method) to [`CutoverPhase`]. Built on
//! `im::HashMap` so a modified copy shares structure with the original.

use dualstore_core::CutoverPhase;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Method key that applies to every method of a domain
pub const ANY_METHOD: &str = "*";

/// (domain, method) key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PhaseKey {
    pub domain: String,
    pub method: String,
}

impl PhaseKey {
    /// Create new key
    #[inline]
    #[must_use]
    pub fn new(domain: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            method: method.into(),
        }
    }

    /// Domain-wide key
    #[inline]
    #[must_use]
    pub fn domain_default(domain: impl Into<String>) -> Self {
        Self::new(domain, ANY_METHOD)
    }
}

impl fmt::Display for PhaseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.domain, self.method)
    }
}

/// One row as written in configuration files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseEntry {
    pub domain: String,
    #[serde(default = "any_method")]
    pub method: String,
    pub phase: CutoverPhase,
}

fn any_method() -> String {
    ANY_METHOD.to_string()
}

/// Immutable snapshot of configured phases
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhaseTable {
    phases: im::HashMap<PhaseKey, CutoverPhase>,
}

impl PhaseTable {
    /// Empty table (everything resolves to `LegacyOnly`)
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from configuration rows; later rows win
    #[must_use]
    pub fn from_entries(entries: impl IntoIterator<Item = PhaseEntry>) -> Self {
        let phases = entries
            .into_iter()
            .map(|e| (PhaseKey::new(e.domain, e.method), e.phase))
            .collect();
        Self { phases }
    }

    /// Copy with one key set
    #[must_use]
    pub fn with_phase(&self, key: PhaseKey, phase: CutoverPhase) -> Self {
        Self {
            phases: self.phases.update(key, phase),
        }
    }

    /// Explicitly configured phase for a key, ignoring fallbacks
    #[inline]
    #[must_use]
    pub fn get(&self, key: &PhaseKey) -> Option<CutoverPhase> {
        self.phases.get(key).copied()
    }

    /// Effective phase: (domain, method), then (domain, `*`), then `LegacyOnly`
    #[must_use]
    pub fn resolve(&self, domain: &str, method: &str) -> CutoverPhase {
        self.get(&PhaseKey::new(domain, method))
            .or_else(|| self.get(&PhaseKey::domain_default(domain)))
            .unwrap_or_default()
    }

    /// Rows sorted by key
    #[must_use]
    pub fn entries(&self) -> Vec<PhaseEntry> {
        let mut rows: Vec<PhaseEntry> = self
            .phases
            .iter()
            .map(|(k, p)| PhaseEntry {
                domain: k.domain.clone(),
                method: k.method.clone(),
                phase: *p,
            })
            .collect();
        rows.sort_by(|a, b| (&a.domain, &a.method).cmp(&(&b.domain, &b.method)));
        rows
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.phases.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }
}
