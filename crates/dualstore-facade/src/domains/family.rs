//! Families

use super::{base_comparator, classification_rows, MigratedDomain};
use chrono::{DateTime, Utc};
use dualstore_core::Domain;
use dualstore_diff::{ClassificationTable, ComparatorConfig, FieldClass};
use serde::{Deserialize, Serialize};

pub const NAME: &str = "family";

/// Family domain marker
#[derive(Debug, Clone, Copy)]
pub struct Families;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Family {
    pub id: String,
    pub name: String,
    pub owner_id: String,
    pub member_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFamily {
    pub name: String,
    pub owner_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyPatch {
    pub name: Option<String>,
    pub owner_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyQuery {
    pub owner_id: Option<String>,
}

impl Domain for Families {
    const NAME: &'static str = NAME;

    type Id = String;
    type Record = Family;
    type Draft = NewFamily;
    type Patch = FamilyPatch;
    type Query = FamilyQuery;
}

impl MigratedDomain for Families {
    fn comparator_config() -> ComparatorConfig {
        base_comparator()
    }

    fn classification() -> ClassificationTable {
        classification_rows(
            NAME,
            &[
                ("owner_id", FieldClass::Critical),
                ("member_count", FieldClass::Derived),
                ("created_at", FieldClass::Volatile),
                ("updated_at", FieldClass::Volatile),
            ],
        )
    }
}
