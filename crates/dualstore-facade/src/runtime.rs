//! Composition root
//!
//! Builds the shared controller, recorder and diff store once, then hands out
//! one [`RepositoryFacade`] per domain. Nothing here is global.

use crate::config::MigrationConfig;
use crate::domains::{builtin_classification, MigratedDomain};
use crate::error::ConfigError;
use crate::facade::RepositoryFacade;
use dualstore_core::StoreAdapter;
use dualstore_cutover::{CutoverController, FilePhaseSource, PhaseSource};
use dualstore_diff::{DiffComparator, DiffEngine, SeverityClassifier};
use dualstore_recorder::{
    DiffRecorder, DiffStore, InMemoryDiffStore, JsonlDiffStore, ReleaseGate, StatsAggregator,
};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Shared migration state for a process
#[derive(Debug)]
pub struct MigrationRuntime {
    config: MigrationConfig,
    controller: Arc<CutoverController>,
    store: Arc<dyn DiffStore>,
    recorder: Arc<DiffRecorder>,
    reload: Option<JoinHandle<()>>,
}

impl MigrationRuntime {
    /// Start from configuration
    ///
    /// Uses a JSONL diff log when `diff_log` is set. When `phase_file` is set
    /// it is loaded now and polled every `reload_interval_ms`.
    ///
    /// # Errors
    /// Returns `ConfigError` if the config is invalid or the phase file
    /// cannot be loaded.
    pub async fn start(config: MigrationConfig) -> Result<Self, ConfigError> {
        let store: Arc<dyn DiffStore> = match &config.diff_log {
            Some(path) => Arc::new(JsonlDiffStore::new(path)),
            None => Arc::new(InMemoryDiffStore::new()),
        };
        let mut runtime = Self::with_store(config, store)?;

        if let Some(path) = runtime.config.phase_file.clone() {
            let source: Arc<dyn PhaseSource> = Arc::new(FilePhaseSource::new(path));
            runtime.controller.reload(source.as_ref()).await?;
            runtime.reload = Some(
                runtime
                    .controller
                    .spawn_reload(source, runtime.config.reload_interval()),
            );
        }

        tracing::info!(
            shadow_timeout_ms = runtime.config.shadow_timeout_ms,
            phases = runtime.controller.snapshot().len(),
            "migration runtime started"
        );
        Ok(runtime)
    }

    /// Start with an explicit diff store
    ///
    /// Must be called inside a tokio runtime.
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` if the config is invalid.
    pub fn with_store(config: MigrationConfig, store: Arc<dyn DiffStore>) -> Result<Self, ConfigError> {
        config.validate()?;
        let controller = Arc::new(CutoverController::with_table(config.phase_table()));
        let recorder = Arc::new(DiffRecorder::spawn(
            Arc::clone(&store),
            config.recorder.clone(),
        ));
        Ok(Self {
            config,
            controller,
            store,
            recorder,
            reload: None,
        })
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    #[inline]
    #[must_use]
    pub fn controller(&self) -> &Arc<CutoverController> {
        &self.controller
    }

    #[inline]
    #[must_use]
    pub fn recorder(&self) -> &Arc<DiffRecorder> {
        &self.recorder
    }

    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<dyn DiffStore> {
        &self.store
    }

    /// Diff engine for `D`: its comparator rules, built-in rows, config overrides
    #[must_use]
    pub fn engine_for<D: MigratedDomain>(&self) -> DiffEngine {
        let mut table = builtin_classification();
        table.extend(&self.config.classification_overrides());
        DiffEngine::new(
            DiffComparator::new(D::comparator_config()),
            SeverityClassifier::new(table),
        )
    }

    /// Facade for `D` over the given adapters
    #[must_use]
    pub fn facade<D: MigratedDomain>(
        &self,
        legacy: Arc<dyn StoreAdapter<D>>,
        target: Arc<dyn StoreAdapter<D>>,
    ) -> Arc<RepositoryFacade<D>> {
        Arc::new(
            RepositoryFacade::new(
                legacy,
                target,
                Arc::clone(&self.controller),
                self.engine_for::<D>(),
                Arc::clone(&self.recorder),
            )
            .with_shadow_timeout(self.config.shadow_timeout()),
        )
    }

    #[must_use]
    pub fn stats(&self) -> StatsAggregator {
        StatsAggregator::new(Arc::clone(&self.store))
    }

    /// Evaluate a release gate against the diff log
    ///
    /// # Errors
    /// Returns the store's error.
    pub async fn check_gate(
        &self,
        gate: &ReleaseGate,
    ) -> Result<dualstore_recorder::GateDecision, dualstore_recorder::StoreError> {
        gate.check(&self.stats()).await
    }

    /// Stop phase polling and drain the recorder
    ///
    /// Facades should be quiesced first so their background comparisons
    /// reach the recorder.
    pub async fn shutdown(mut self) {
        if let Some(handle) = self.reload.take() {
            handle.abort();
        }
        self.recorder.shutdown().await;
        tracing::info!("migration runtime stopped");
    }
}

impl Drop for MigrationRuntime {
    fn drop(&mut self) {
        if let Some(handle) = self.reload.take() {
            handle.abort();
        }
    }
}
