//! Meal logging
//!
//! A meal carries its food items as a list. Items are matched by `food_id`
//! rather than position, since the two stores do not agree on item order.

use super::{base_comparator, classification_rows, record_rule, MigratedDomain};
use chrono::{DateTime, Utc};
use dualstore_core::Domain;
use dualstore_diff::{ClassificationTable, ComparatorConfig, FieldClass, FieldRule};
use serde::{Deserialize, Serialize};

pub const NAME: &str = "meal";

/// Meal domain marker
#[derive(Debug, Clone, Copy)]
pub struct Meals;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealItem {
    pub food_id: u64,
    pub name: String,
    pub grams: u32,
    pub calories: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meal {
    pub id: String,
    pub family_id: String,
    pub member_id: String,
    pub meal_type: MealType,
    pub items: Vec<MealItem>,
    /// Sum of item calories, maintained by the store
    pub total_calories: u32,
    pub logged_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Meal {
    #[must_use]
    pub fn expected_calories(&self) -> u32 {
        self.items.iter().map(|i| i.calories).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMeal {
    pub family_id: String,
    pub member_id: String,
    pub meal_type: MealType,
    pub items: Vec<MealItem>,
    pub logged_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealPatch {
    pub meal_type: Option<MealType>,
    pub items: Option<Vec<MealItem>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealQuery {
    pub family_id: Option<String>,
    pub member_id: Option<String>,
    pub since: Option<DateTime<Utc>>,
}

impl Domain for Meals {
    const NAME: &'static str = NAME;

    type Id = String;
    type Record = Meal;
    type Draft = NewMeal;
    type Patch = MealPatch;
    type Query = MealQuery;
}

impl MigratedDomain for Meals {
    fn comparator_config() -> ComparatorConfig {
        record_rule(base_comparator(), "items", FieldRule::KeyedBy("food_id".into()))
    }

    fn classification() -> ClassificationTable {
        classification_rows(
            NAME,
            &[
                ("meal_type", FieldClass::Critical),
                ("items[*]", FieldClass::Critical),
                ("items[*].grams", FieldClass::Critical),
                ("total_calories", FieldClass::Derived),
                ("logged_at", FieldClass::Volatile),
                ("updated_at", FieldClass::Volatile),
            ],
        )
    }
}
