//! Diff stores
//!
//! Append plus time-range query; nothing else is needed by the recorder or the
//! stats aggregator. Retention belongs to whoever owns the store.

use crate::error::StoreError;
use crate::row::DiffLogRow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dualstore_core::DiffRecord;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

/// Durable sink for diff records
#[async_trait]
pub trait DiffStore: Send + Sync + std::fmt::Debug {
    /// Append one record
    async fn append(&self, record: &DiffRecord) -> Result<(), StoreError>;

    /// Records with `since <= created_at <= until`, oldest first
    async fn query_range(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<DiffRecord>, StoreError>;
}

/// Process-local store
#[derive(Debug, Default)]
pub struct InMemoryDiffStore {
    records: RwLock<Vec<DiffRecord>>,
}

impl InMemoryDiffStore {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All records in append order
    #[must_use]
    pub fn records(&self) -> Vec<DiffRecord> {
        self.records.read().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl DiffStore for InMemoryDiffStore {
    async fn append(&self, record: &DiffRecord) -> Result<(), StoreError> {
        self.records.write().push(record.clone());
        Ok(())
    }

    async fn query_range(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<DiffRecord>, StoreError> {
        let mut hits: Vec<DiffRecord> = self
            .records
            .read()
            .iter()
            .filter(|r| r.created_at >= since && r.created_at <= until)
            .cloned()
            .collect();
        hits.sort_by_key(|r| r.created_at);
        Ok(hits)
    }
}

/// Append-only JSON Lines file of [`DiffLogRow`]s
///
/// Unparseable lines are skipped with a warning on query. Queries stream the
/// file line by line; memory is bounded by the matching rows, time by the
/// size of the whole log.
#[derive(Debug)]
pub struct JsonlDiffStore {
    path: PathBuf,
    append_lock: tokio::sync::Mutex<()>,
}

impl JsonlDiffStore {
    #[inline]
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            append_lock: tokio::sync::Mutex::new(()),
        }
    }

    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl DiffStore for JsonlDiffStore {
    async fn append(&self, record: &DiffRecord) -> Result<(), StoreError> {
        let mut line = serde_json::to_string(&DiffLogRow::from(record))?;
        line.push('\n');

        let _guard = self.append_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| StoreError::io_error(&self.path, e))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| StoreError::io_error(&self.path, e))?;
        file.flush()
            .await
            .map_err(|e| StoreError::io_error(&self.path, e))
    }

    async fn query_range(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<DiffRecord>, StoreError> {
        let file = match tokio::fs::File::open(&self.path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io_error(&self.path, e)),
        };

        let mut lines = BufReader::new(file).lines();
        let mut hits = Vec::new();
        let mut index = 0usize;
        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| StoreError::io_error(&self.path, e))?
        {
            index += 1;
            if line.trim().is_empty() {
                continue;
            }
            let parsed = serde_json::from_str::<DiffLogRow>(&line)
                .map_err(StoreError::from)
                .and_then(DiffRecord::try_from);
            match parsed {
                Ok(record) if record.created_at >= since && record.created_at <= until => {
                    hits.push(record);
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(path = %self.path.display(), line = index, error = %e, "skipping diff log row");
                }
            }
        }
        hits.sort_by_key(|r| r.created_at);
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use dualstore_core::{ComparisonResult, DiffEntry, Operation, OperationKind, Severity};
    use serde_json::json;

    fn record_at(ts: DateTime<Utc>) -> DiffRecord {
        let op = Operation::of_kind("family", OperationKind::Read);
        let payload = vec![DiffEntry::new("name", json!("a").into(), json!("b").into())];
        DiffRecord::from_comparison(&op, ComparisonResult::divergent(payload, Severity::Warning))
            .unwrap()
            .at(ts)
    }

    #[tokio::test]
    async fn memory_range_is_inclusive() {
        let store = InMemoryDiffStore::new();
        let now = Utc::now();
        for hours in [0, 1, 30] {
            store.append(&record_at(now - Duration::hours(hours))).await.unwrap();
        }
        let hits = store
            .query_range(now - Duration::hours(24), now)
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits[0].created_at <= hits[1].created_at);
    }

    #[tokio::test]
    async fn jsonl_appends_and_queries() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlDiffStore::new(dir.path().join("diffs.jsonl"));
        let now = Utc::now();
        let fresh = record_at(now);
        store.append(&fresh).await.unwrap();
        store.append(&record_at(now - Duration::days(3))).await.unwrap();

        let hits = store
            .query_range(now - Duration::days(1), now)
            .await
            .unwrap();
        assert_eq!(hits, vec![fresh]);
    }

    #[tokio::test]
    async fn jsonl_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlDiffStore::new(dir.path().join("absent.jsonl"));
        let now = Utc::now();
        assert!(store
            .query_range(now - Duration::days(1), now)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn jsonl_skips_corrupt_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("diffs.jsonl");
        let store = JsonlDiffStore::new(&path);
        let now = Utc::now();
        store.append(&record_at(now)).await.unwrap();

        let mut text = tokio::fs::read_to_string(&path).await.unwrap();
        text.push_str("{not json\n");
        tokio::fs::write(&path, text).await.unwrap();

        let hits = store
            .query_range(now - Duration::minutes(1), now)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn jsonl_streams_large_log_and_unterminated_tail() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("diffs.jsonl");
        let store = JsonlDiffStore::new(&path);
        let now = Utc::now();
        for i in 0..200 {
            store.append(&record_at(now - Duration::days(i + 10))).await.unwrap();
        }
        store.append(&record_at(now)).await.unwrap();

        let mut text = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(text.pop(), Some('\n'));
        tokio::fs::write(&path, text).await.unwrap();

        let hits = store
            .query_range(now - Duration::days(1), now)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].created_at, now);
    }
}
