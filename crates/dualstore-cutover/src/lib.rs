//! Dualstore Cutover
//!
//! Per-(domain, method) migration phase control.
//!
//! - [`CutoverController`]: O(1) `phase_for` on an immutable snapshot;
//!   monotonic `set_phase`, explicit `force_phase` override
//! - [`PhaseTable`]: copy-on-write (domain, method) → phase map with
//!   `(domain, *)` fallback
//! - [`PhaseSource`]: dynamic configuration ([`FilePhaseSource`],
//!   [`StaticPhaseSource`])
//!
//! # Example
//!
//! ```rust
//! use dualstore_core::CutoverPhase;
//! use dualstore_cutover::CutoverController;
//!
//! let controller = CutoverController::new();
//! assert_eq!(controller.phase_for("family", "read"), CutoverPhase::LegacyOnly);
//!
//! controller.set_phase("family", "*", CutoverPhase::DualLegacyPrimary).unwrap();
//! assert_eq!(controller.phase_for("family", "read"), CutoverPhase::DualLegacyPrimary);
//! assert!(controller.set_phase("family", "read", CutoverPhase::LegacyOnly).is_err());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod controller;
mod error;
mod source;
mod table;

pub use controller::{CutoverController, PhaseChange};
pub use error::CutoverError;
pub use source::{FilePhaseSource, PhaseFile, PhaseSource, StaticPhaseSource};
pub use table::{PhaseEntry, PhaseKey, PhaseTable, ANY_METHOD};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
