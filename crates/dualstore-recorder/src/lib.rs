//! Dualstore Recorder
//!
//! Persistence and reporting of detected drift:
//! - [`DiffRecorder`]: non-blocking, bounded queue drained by a detached task
//! - [`DiffStore`]: append + time-range query ([`InMemoryDiffStore`],
//!   [`JsonlDiffStore`])
//! - [`StatsAggregator`] and [`ReleaseGate`]: windowed drift counts
//!
//! # Example
//!
//! ```rust
//! use dualstore_core::{ComparisonResult, DiffEntry, Operation, OperationKind, Severity};
//! use dualstore_recorder::{DiffRecorder, InMemoryDiffStore, RecorderConfig, StatsAggregator};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let store = Arc::new(InMemoryDiffStore::new());
//! let recorder = DiffRecorder::spawn(store.clone(), RecorderConfig::default());
//!
//! let op = Operation::of_kind("task", OperationKind::Read);
//! let entry = DiffEntry::new("updated_at", json!("t1").into(), json!("t2").into());
//! recorder.record(&op, ComparisonResult::divergent(vec![entry], Severity::Info));
//! recorder.flush().await;
//!
//! let stats = StatsAggregator::new(store).stats_for(1).await.unwrap();
//! assert_eq!(stats.severity_breakdown.info, 1);
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod error;
mod recorder;
mod row;
mod stats;
mod store;

pub use error::StoreError;
pub use recorder::{DiffRecorder, OverflowPolicy, RecordOutcome, RecorderConfig, RecorderStats};
pub use row::DiffLogRow;
pub use stats::{
    DiffStats, EndpointCount, GateDecision, ReleaseGate, SeverityBreakdown, StatsAggregator,
    DEFAULT_TOP_ENDPOINTS,
};
pub use store::{DiffStore, InMemoryDiffStore, JsonlDiffStore};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
