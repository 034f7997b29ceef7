//! Domain modules under migration
//!
//! Each module defines its record types and the comparison rules and
//! classification rows the diff engine uses for it.

pub mod family;
pub mod inventory;
pub mod meal;
pub mod task;

use dualstore_core::Domain;
use dualstore_diff::{ClassificationTable, ComparatorConfig, FieldClass, FieldRule};

pub use family::Families;
pub use inventory::Inventory;
pub use meal::Meals;
pub use task::Tasks;

/// Names of the built-in domains
pub const DOMAIN_NAMES: [&str; 4] = [Families::NAME, Tasks::NAME, Inventory::NAME, Meals::NAME];

/// A domain with migration rules attached
pub trait MigratedDomain: Domain {
    /// How results of this domain are compared
    fn comparator_config() -> ComparatorConfig;

    /// Classification rows for this domain's fields
    fn classification() -> ClassificationTable;
}

/// Comparator config shared by every domain: list results matched by `id`
#[must_use]
pub fn base_comparator() -> ComparatorConfig {
    ComparatorConfig::new().with_rule("$", FieldRule::KeyedBy("id".into()))
}

/// Apply `rule` to a record field both in single results and in list elements
#[must_use]
pub fn record_rule(config: ComparatorConfig, field: &str, rule: FieldRule) -> ComparatorConfig {
    config
        .with_rule(field, rule.clone())
        .with_rule(format!("[*].{field}"), rule)
}

/// Classification rows for `domain` given as (pattern, class) pairs
#[must_use]
pub fn classification_rows(domain: &str, rows: &[(&str, FieldClass)]) -> ClassificationTable {
    rows.iter()
        .fold(ClassificationTable::empty(), |table, (pattern, class)| {
            table.with_rule(domain, *pattern, *class)
        })
}

/// Comparator rules for a domain by name
#[must_use]
pub fn comparator_for(domain: &str) -> Option<ComparatorConfig> {
    match domain {
        family::NAME => Some(Families::comparator_config()),
        task::NAME => Some(Tasks::comparator_config()),
        inventory::NAME => Some(Inventory::comparator_config()),
        meal::NAME => Some(Meals::comparator_config()),
        _ => None,
    }
}

/// Built-in rows for every domain, on top of the domain-independent defaults
#[must_use]
pub fn builtin_classification() -> ClassificationTable {
    let mut table = ClassificationTable::with_defaults();
    table.extend(&Families::classification());
    table.extend(&Tasks::classification());
    table.extend(&Inventory::classification());
    table.extend(&Meals::classification());
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use dualstore_core::{Operation, OperationKind, Severity};
    use dualstore_diff::{DiffComparator, DiffEngine, SeverityClassifier};
    use serde_json::json;

    fn engine(domain: &str) -> DiffEngine {
        DiffEngine::new(
            DiffComparator::new(comparator_for(domain).unwrap()),
            SeverityClassifier::new(builtin_classification()),
        )
    }

    #[test]
    fn every_domain_has_rules() {
        for name in DOMAIN_NAMES {
            assert!(comparator_for(name).is_some(), "{name}");
        }
        assert!(comparator_for("unknown").is_none());
    }

    #[test]
    fn list_elements_matched_by_id() {
        let op = Operation::of_kind("task", OperationKind::List);
        let legacy = json!([{"id": "a", "status": "OPEN"}, {"id": "b", "status": "OPEN"}]);
        let target = json!([{"id": "b", "status": "OPEN"}, {"id": "a", "status": "OPEN"}]);
        assert!(engine("task").evaluate(&op, &legacy, &target).is_equivalent());
    }

    #[test]
    fn list_element_missing_is_error() {
        let op = Operation::of_kind("family", OperationKind::List);
        let legacy = json!([{"id": "a"}, {"id": "b"}]);
        let target = json!([{"id": "a"}]);
        let result = engine("family").evaluate(&op, &legacy, &target);
        assert_eq!(result.severity(), Some(Severity::Error));
    }

    #[test]
    fn list_field_rules_apply_per_element() {
        let op = Operation::of_kind("task", OperationKind::List);
        let legacy = json!([{"id": "a", "status": "DONE", "updated_at": "t1"}]);
        let target = json!([{"id": "a", "status": "DONE", "updated_at": "t2"}]);
        let result = engine("task").evaluate(&op, &legacy, &target);
        assert_eq!(result.severity(), Some(Severity::Info));
    }
}
