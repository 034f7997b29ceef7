//! Comparator and classifier bundled for one domain

use crate::classifier::SeverityClassifier;
use crate::comparator::DiffComparator;
use crate::error::ComparisonError;
use dualstore_core::{Backend, ComparisonResult, DiffEntry, Operation, Severity};
use serde_json::Value;

/// Produces a [`ComparisonResult`] from two backend results
///
/// Comparator failures become an ERROR result carrying the diagnostic; they
/// are never dropped.
#[derive(Debug, Clone, Default)]
pub struct DiffEngine {
    comparator: DiffComparator,
    classifier: SeverityClassifier,
}

impl DiffEngine {
    /// Create engine
    #[inline]
    #[must_use]
    pub fn new(comparator: DiffComparator, classifier: SeverityClassifier) -> Self {
        Self {
            comparator,
            classifier,
        }
    }

    #[inline]
    #[must_use]
    pub fn comparator(&self) -> &DiffComparator {
        &self.comparator
    }

    #[inline]
    #[must_use]
    pub fn classifier(&self) -> &SeverityClassifier {
        &self.classifier
    }

    /// Compare legacy and target results and classify the outcome
    #[must_use]
    pub fn evaluate(&self, operation: &Operation, legacy: &Value, target: &Value) -> ComparisonResult {
        match self.comparator.compare(legacy, target) {
            Ok(payload) if payload.is_empty() => ComparisonResult::Equivalent,
            Ok(payload) => {
                let severity = self.classifier.classify(operation, &payload);
                ComparisonResult::divergent(payload, severity)
            }
            Err(err) => Self::comparison_failure(&err),
        }
    }

    /// ERROR result for a comparator failure
    #[must_use]
    pub fn comparison_failure(err: &ComparisonError) -> ComparisonResult {
        ComparisonResult::divergent(
            vec![DiffEntry::incomparable(err.path(), err.to_string())],
            Severity::Error,
        )
    }

    /// ERROR result for a shadow backend that failed
    ///
    /// `primary_value` is what the healthy backend returned.
    #[must_use]
    pub fn shadow_unavailable(
        shadow: Backend,
        reason: impl Into<String>,
        primary_value: Value,
    ) -> ComparisonResult {
        ComparisonResult::divergent(
            vec![DiffEntry::backend_unavailable(shadow, reason, primary_value)],
            Severity::Error,
        )
    }
}
