//! Chore tasks

use super::{base_comparator, classification_rows, record_rule, MigratedDomain};
use chrono::{DateTime, NaiveDate, Utc};
use dualstore_core::Domain;
use dualstore_diff::{ClassificationTable, ComparatorConfig, FieldClass, FieldRule};
use serde::{Deserialize, Serialize};

pub const NAME: &str = "task";

/// Task domain marker
#[derive(Debug, Clone, Copy)]
pub struct Tasks;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Open,
    InProgress,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub family_id: String,
    pub title: String,
    pub status: TaskStatus,
    pub assignee_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    pub points: u32,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    pub family_id: String,
    pub title: String,
    pub assignee_id: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub points: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub status: Option<TaskStatus>,
    pub assignee_id: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub points: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskQuery {
    pub family_id: Option<String>,
    pub status: Option<TaskStatus>,
    pub assignee_id: Option<String>,
}

impl Domain for Tasks {
    const NAME: &'static str = NAME;

    type Id = String;
    type Record = Task;
    type Draft = NewTask;
    type Patch = TaskPatch;
    type Query = TaskQuery;
}

impl MigratedDomain for Tasks {
    fn comparator_config() -> ComparatorConfig {
        record_rule(base_comparator(), "due_date", FieldRule::NullEqualsMissing)
    }

    fn classification() -> ClassificationTable {
        classification_rows(
            NAME,
            &[
                ("status", FieldClass::Critical),
                ("assignee_id", FieldClass::Critical),
                ("points", FieldClass::Critical),
                ("updated_at", FieldClass::Volatile),
            ],
        )
    }
}
