//! Household inventory (pantry, supplies)

use super::{base_comparator, classification_rows, record_rule, MigratedDomain};
use chrono::{DateTime, NaiveDate, Utc};
use dualstore_core::Domain;
use dualstore_diff::{ClassificationTable, ComparatorConfig, FieldClass, FieldRule};
use serde::{Deserialize, Serialize};

pub const NAME: &str = "inventory";

/// Inventory domain marker
#[derive(Debug, Clone, Copy)]
pub struct Inventory;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: String,
    pub family_id: String,
    pub name: String,
    pub quantity: f64,
    pub unit: String,
    /// Price per unit in cents
    pub unit_cost_cents: i64,
    /// `quantity * unit_cost_cents`, maintained by the store
    pub total_value_cents: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<NaiveDate>,
    pub updated_at: DateTime<Utc>,
}

impl InventoryItem {
    /// Value the store should report for `total_value_cents`
    #[must_use]
    pub fn expected_total_cents(&self) -> i64 {
        #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
        let total = (self.quantity * self.unit_cost_cents as f64).round() as i64;
        total
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewInventoryItem {
    pub family_id: String,
    pub name: String,
    pub quantity: f64,
    pub unit: String,
    pub unit_cost_cents: i64,
    pub expires_at: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InventoryPatch {
    pub name: Option<String>,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub unit_cost_cents: Option<i64>,
    pub expires_at: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryQuery {
    pub family_id: Option<String>,
    /// Only items expiring on or before this date
    pub expiring_before: Option<NaiveDate>,
}

impl Domain for Inventory {
    const NAME: &'static str = NAME;

    type Id = String;
    type Record = InventoryItem;
    type Draft = NewInventoryItem;
    type Patch = InventoryPatch;
    type Query = InventoryQuery;
}

impl MigratedDomain for Inventory {
    fn comparator_config() -> ComparatorConfig {
        record_rule(base_comparator(), "expires_at", FieldRule::NullEqualsMissing)
    }

    fn classification() -> ClassificationTable {
        classification_rows(
            NAME,
            &[
                ("unit_cost_cents", FieldClass::Critical),
                ("total_value_cents", FieldClass::Derived),
                ("updated_at", FieldClass::Volatile),
            ],
        )
    }
}
