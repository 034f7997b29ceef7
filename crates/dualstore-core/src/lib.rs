//! Dualstore Core
//!
//! Shared vocabulary for the dual-write migration layer:
//! - [`Operation`] and [`OperationKind`]: what was attempted, independent of backend
//! - [`CutoverPhase`]: which backend(s) serve a (domain, method) pair
//! - [`DiffEntry`], [`ComparisonResult`], [`DiffRecord`]: detected drift
//! - [`Domain`] and [`StoreAdapter`]: the contract every backend implements
//!
//! # Example
//!
//! ```rust
//! use dualstore_core::{Backend, CutoverPhase};
//!
//! let phase = CutoverPhase::DualTargetPrimary;
//! assert_eq!(phase.primary(), Backend::Target);
//! assert_eq!(phase.shadow(), Some(Backend::Legacy));
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod adapter;
pub mod diff;
pub mod domain;
pub mod error;
pub mod types;

pub use adapter::{AdapterError, StoreAdapter};
pub use diff::{ComparisonResult, DiffEntry, DiffPayload, DiffRecord, DiffRecordId, DiffValue};
pub use domain::{Domain, Request, Response};
pub use error::FailureKind;
pub use types::{Backend, CutoverPhase, Operation, OperationKind, ParseEnumError, Severity};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for domain modules and adapters
    pub use crate::{
        AdapterError, Backend, ComparisonResult, CutoverPhase, DiffEntry, DiffValue, Domain,
        Operation, OperationKind, Request, Response, Severity, StoreAdapter,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
