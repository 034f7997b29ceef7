//! Dualstore Diff
//!
//! Structural comparison and severity classification of dual-store results.
//!
//! # Core Concepts
//!
//! - [`DiffComparator`]: field-path-aware structural diff over JSON values
//! - [`FieldRule`]: per-path comparison behaviour (null handling, sets, ignore)
//! - [`SeverityClassifier`]: versioned (domain, path) → severity table
//! - [`DiffEngine`]: both of the above, producing a `ComparisonResult`
//!
//! # Example
//!
//! ```rust
//! use dualstore_core::{Operation, OperationKind, Severity};
//! use dualstore_diff::{
//!     ClassificationTable, ComparatorConfig, DiffComparator, DiffEngine, FieldClass,
//!     SeverityClassifier,
//! };
//! use serde_json::json;
//!
//! let engine = DiffEngine::new(
//!     DiffComparator::new(ComparatorConfig::new()),
//!     SeverityClassifier::new(
//!         ClassificationTable::with_defaults().with_rule("task", "updated_at", FieldClass::Volatile),
//!     ),
//! );
//! let op = Operation::of_kind("task", OperationKind::Read);
//! let result = engine.evaluate(
//!     &op,
//!     &json!({"id": "1", "updated_at": "T1"}),
//!     &json!({"id": "1", "updated_at": "T2"}),
//! );
//! assert_eq!(result.severity(), Some(Severity::Info));
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod classifier;
mod comparator;
mod engine;
mod error;
pub mod path;

pub use classifier::{
    ClassificationTable, FieldClass, SeverityClassifier, ANY_DOMAIN, MINTED_ID_FIELD, TABLE_VERSION,
};
pub use comparator::{canonical, ComparatorConfig, DiffComparator, FieldRule, DEFAULT_MAX_DEPTH};
pub use engine::DiffEngine;
pub use error::ComparisonError;
pub use path::{FieldPath, Segment};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
