//! Diff log row
//!
//! The flat shape a diff store persists: one row per [`DiffRecord`], with the
//! endpoint collapsed to `domain.method`.

use crate::error::StoreError;
use chrono::{DateTime, Utc};
use dualstore_core::{DiffPayload, DiffRecord, DiffRecordId, Operation, OperationKind, Severity};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// One persisted drift observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffLogRow {
    pub id: String,
    /// `domain.method`
    pub api_endpoint: String,
    pub operation: OperationKind,
    pub severity: Severity,
    pub diff: DiffPayload,
    pub created_at: DateTime<Utc>,
}

impl From<&DiffRecord> for DiffLogRow {
    fn from(record: &DiffRecord) -> Self {
        Self {
            id: record.id.to_string(),
            api_endpoint: record.endpoint(),
            operation: record.operation.kind,
            severity: record.severity,
            diff: record.payload.clone(),
            created_at: record.created_at,
        }
    }
}

impl TryFrom<DiffLogRow> for DiffRecord {
    type Error = StoreError;

    fn try_from(row: DiffLogRow) -> Result<Self, Self::Error> {
        let id = Ulid::from_string(&row.id)
            .map_err(|e| StoreError::Corrupt(format!("id '{}': {e}", row.id)))?;
        let (domain, method) = row
            .api_endpoint
            .split_once('.')
            .ok_or_else(|| StoreError::Corrupt(format!("endpoint '{}'", row.api_endpoint)))?;

        Ok(Self {
            id: DiffRecordId(id),
            domain: domain.to_string(),
            method: method.to_string(),
            operation: Operation::new(domain, method, row.operation),
            severity: row.severity,
            payload: row.diff,
            created_at: row.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dualstore_core::{ComparisonResult, DiffEntry};
    use serde_json::json;

    fn record() -> DiffRecord {
        let op = Operation::new("task", "complete", OperationKind::Update);
        let payload = vec![DiffEntry::new("status", json!("DONE").into(), json!("OPEN").into())];
        DiffRecord::from_comparison(&op, ComparisonResult::divergent(payload, Severity::Error))
            .unwrap()
    }

    #[test]
    fn row_shape() {
        let row = DiffLogRow::from(&record());
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["api_endpoint"], "task.complete");
        assert_eq!(json["operation"], "UPDATE");
        assert_eq!(json["severity"], "error");
        assert_eq!(json["diff"][0]["field_path"], "status");
    }

    #[test]
    fn row_restores_record() {
        let original = record();
        let restored = DiffRecord::try_from(DiffLogRow::from(&original)).unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn bad_endpoint_is_corrupt() {
        let mut row = DiffLogRow::from(&record());
        row.api_endpoint = "nodot".into();
        assert!(matches!(DiffRecord::try_from(row), Err(StoreError::Corrupt(_))));
    }
}
