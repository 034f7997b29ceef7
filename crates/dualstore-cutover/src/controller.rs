//! Cutover controller
//!
//! Read on every facade call, written rarely by operators. Readers clone an
//! `Arc` to the current [`PhaseTable`]; writers build a new table and swap
//! it in. A reader never waits on a writer's table construction.

use crate::error::CutoverError;
use crate::source::PhaseSource;
use crate::table::{PhaseEntry, PhaseKey, PhaseTable};
use dualstore_core::CutoverPhase;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Result of a phase write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseChange {
    /// Effective phase before the write
    pub previous: CutoverPhase,
    /// Phase now configured
    pub current: CutoverPhase,
}

impl PhaseChange {
    #[inline]
    #[must_use]
    pub fn is_regression(&self) -> bool {
        self.current < self.previous
    }

    #[inline]
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.current == self.previous
    }
}

/// Process-wide phase configuration
#[derive(Debug, Default)]
pub struct CutoverController {
    snapshot: RwLock<Arc<PhaseTable>>,
    /// Serializes read-modify-write on the admin path
    write_lock: Mutex<()>,
    generation: AtomicU64,
}

impl CutoverController {
    /// Controller with nothing configured
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Controller starting from a table
    #[must_use]
    pub fn with_table(table: PhaseTable) -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(table)),
            write_lock: Mutex::new(()),
            generation: AtomicU64::new(0),
        }
    }

    /// Effective phase for (domain, method)
    ///
    /// Never fails; unconfigured pairs are `LegacyOnly`.
    #[inline]
    #[must_use]
    pub fn phase_for(&self, domain: &str, method: &str) -> CutoverPhase {
        self.snapshot.read().resolve(domain, method)
    }

    /// Current snapshot
    #[inline]
    #[must_use]
    pub fn snapshot(&self) -> Arc<PhaseTable> {
        self.snapshot.read().clone()
    }

    /// Number of snapshot swaps since construction
    #[inline]
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Configured rows
    #[must_use]
    pub fn entries(&self) -> Vec<PhaseEntry> {
        self.snapshot().entries()
    }

    /// Advance (domain, method) to `phase`
    ///
    /// # Errors
    /// - `CutoverError::Regression` if `phase` is behind the effective phase
    /// - `CutoverError::InvalidKey` if domain or method is empty
    pub fn set_phase(
        &self,
        domain: &str,
        method: &str,
        phase: CutoverPhase,
    ) -> Result<PhaseChange, CutoverError> {
        self.write(domain, method, phase, false)
    }

    /// Set (domain, method) to `phase`, allowing regression
    ///
    /// This is the explicit operator override.
    ///
    /// # Errors
    /// - `CutoverError::InvalidKey` if domain or method is empty
    pub fn force_phase(
        &self,
        domain: &str,
        method: &str,
        phase: CutoverPhase,
    ) -> Result<PhaseChange, CutoverError> {
        self.write(domain, method, phase, true)
    }

    fn write(
        &self,
        domain: &str,
        method: &str,
        phase: CutoverPhase,
        allow_regression: bool,
    ) -> Result<PhaseChange, CutoverError> {
        if domain.trim().is_empty() || method.trim().is_empty() {
            return Err(CutoverError::InvalidKey(format!("'{domain}'.'{method}'")));
        }

        let _guard = self.write_lock.lock();
        let current = self.snapshot();
        let previous = current.resolve(domain, method);
        let change = PhaseChange {
            previous,
            current: phase,
        };

        if change.is_regression() && !allow_regression {
            return Err(CutoverError::Regression {
                domain: domain.to_string(),
                method: method.to_string(),
                from: previous,
                to: phase,
            });
        }

        let next = current.with_phase(PhaseKey::new(domain, method), phase);
        self.swap(next);

        if change.is_regression() {
            tracing::warn!(domain, method, from = %previous, to = %phase, "cutover phase regressed by override");
        } else if !change.is_noop() {
            tracing::info!(domain, method, from = %previous, to = %phase, "cutover phase advanced");
        }
        Ok(change)
    }

    /// Replace the whole table (explicit reconfiguration)
    ///
    /// Regressions are allowed here and logged per key.
    pub fn replace(&self, table: PhaseTable) {
        let _guard = self.write_lock.lock();
        let current = self.snapshot();
        for entry in table.entries() {
            let before = current.resolve(&entry.domain, &entry.method);
            if entry.phase < before {
                tracing::warn!(
                    domain = %entry.domain,
                    method = %entry.method,
                    from = %before,
                    to = %entry.phase,
                    "reconfiguration regressed cutover phase"
                );
            }
        }
        self.swap(table);
    }

    /// Load a table from `source` and replace the snapshot
    ///
    /// On error the current snapshot stays in place.
    ///
    /// # Errors
    /// Returns the source's error.
    pub async fn reload(&self, source: &dyn PhaseSource) -> Result<usize, CutoverError> {
        let table = source.load().await?;
        let rows = table.len();
        if *self.snapshot() != table {
            self.replace(table);
            tracing::info!(rows, generation = self.generation(), "cutover phases reloaded");
        }
        Ok(rows)
    }

    /// Poll `source` every `interval` in the background
    ///
    /// Failed loads are logged and the previous snapshot kept.
    pub fn spawn_reload(
        self: &Arc<Self>,
        source: Arc<dyn PhaseSource>,
        interval: Duration,
    ) -> JoinHandle<()> {
        let controller = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = controller.reload(source.as_ref()).await {
                    tracing::warn!(error = %e, "cutover phase reload failed; keeping previous snapshot");
                }
            }
        })
    }

    fn swap(&self, table: PhaseTable) {
        *self.snapshot.write() = Arc::new(table);
        self.generation.fetch_add(1, Ordering::AcqRel);
    }
}
