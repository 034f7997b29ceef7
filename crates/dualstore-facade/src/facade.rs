//! Repository facade
//!
//! The one entry point a domain module calls instead of a backend. Each call
//! resolves the cutover phase for its (domain, method), runs one or both
//! adapters, and hands any divergence to the recorder. Only the primary
//! backend's result, or its error, reaches the caller.

use crate::error::FacadeError;
use dualstore_core::{
    AdapterError, Backend, ComparisonResult, CutoverPhase, Domain, Operation, OperationKind,
    Request, Response, StoreAdapter,
};
use dualstore_cutover::CutoverController;
use dualstore_diff::{ComparisonError, DiffEngine};
use dualstore_recorder::DiffRecorder;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::Instrument;

/// Default bound on a shadow call
pub const DEFAULT_SHADOW_TIMEOUT: Duration = Duration::from_millis(2000);

/// Dual-store repository for one domain
#[derive(Debug)]
pub struct RepositoryFacade<D: Domain> {
    legacy: Arc<dyn StoreAdapter<D>>,
    target: Arc<dyn StoreAdapter<D>>,
    controller: Arc<CutoverController>,
    engine: Arc<DiffEngine>,
    recorder: Arc<DiffRecorder>,
    shadow_timeout: Duration,
    background: Arc<Background>,
}

impl<D: Domain> RepositoryFacade<D> {
    /// Create facade
    #[must_use]
    pub fn new(
        legacy: Arc<dyn StoreAdapter<D>>,
        target: Arc<dyn StoreAdapter<D>>,
        controller: Arc<CutoverController>,
        engine: DiffEngine,
        recorder: Arc<DiffRecorder>,
    ) -> Self {
        Self {
            legacy,
            target,
            controller,
            engine: Arc::new(engine),
            recorder,
            shadow_timeout: DEFAULT_SHADOW_TIMEOUT,
            background: Arc::new(Background::default()),
        }
    }

    /// With shadow call bound
    #[inline]
    #[must_use]
    pub fn with_shadow_timeout(mut self, timeout: Duration) -> Self {
        self.shadow_timeout = timeout;
        self
    }

    #[inline]
    #[must_use]
    pub fn shadow_timeout(&self) -> Duration {
        self.shadow_timeout
    }

    /// Phase that would serve (this domain, `method`) right now
    #[inline]
    #[must_use]
    pub fn phase_for(&self, method: &str) -> CutoverPhase {
        self.controller.phase_for(D::NAME, method)
    }

    /// Run `request` under the phase configured for `method`
    ///
    /// # Errors
    /// Returns `FacadeError::Primary` if the primary backend fails. Shadow
    /// failures never surface here.
    pub async fn execute(
        &self,
        method: &str,
        request: Request<D>,
    ) -> Result<Response<D>, FacadeError> {
        let kind = request.kind();
        let phase = self.phase_for(method);
        let operation = Operation::new(D::NAME, method, kind);
        let span = tracing::debug_span!(
            "facade",
            domain = D::NAME,
            method,
            kind = %kind,
            phase = %phase
        );

        async move {
            metrics::counter!(
                "dualstore_facade_calls_total",
                "domain" => D::NAME,
                "phase" => phase.as_str()
            )
            .increment(1);

            match phase.shadow() {
                None => self.single(phase.primary(), request).await,
                Some(shadow) if kind.is_write() => {
                    self.dual_write(operation, phase.primary(), shadow, request)
                        .await
                }
                Some(shadow) => {
                    self.dual_read(operation, phase.primary(), shadow, request)
                        .await
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Create through the default `create` method
    ///
    /// # Errors
    /// Returns the primary backend's error.
    pub async fn create(&self, draft: D::Draft) -> Result<D::Record, FacadeError> {
        match self.run(OperationKind::Create, Request::Create(draft)).await? {
            Response::Created(record) => Ok(record),
            other => Err(unexpected(OperationKind::Create, &other)),
        }
    }

    /// Read through the default `read` method
    ///
    /// # Errors
    /// Returns the primary backend's error.
    pub async fn read(&self, id: D::Id) -> Result<Option<D::Record>, FacadeError> {
        match self.run(OperationKind::Read, Request::Read(id)).await? {
            Response::Read(record) => Ok(record),
            other => Err(unexpected(OperationKind::Read, &other)),
        }
    }

    /// Update through the default `update` method
    ///
    /// # Errors
    /// Returns the primary backend's error.
    pub async fn update(&self, id: D::Id, patch: D::Patch) -> Result<D::Record, FacadeError> {
        match self.run(OperationKind::Update, Request::Update(id, patch)).await? {
            Response::Updated(record) => Ok(record),
            other => Err(unexpected(OperationKind::Update, &other)),
        }
    }

    /// Delete through the default `delete` method
    ///
    /// # Errors
    /// Returns the primary backend's error.
    pub async fn delete(&self, id: D::Id) -> Result<(), FacadeError> {
        match self.run(OperationKind::Delete, Request::Delete(id)).await? {
            Response::Deleted => Ok(()),
            other => Err(unexpected(OperationKind::Delete, &other)),
        }
    }

    /// List through the default `list` method
    ///
    /// # Errors
    /// Returns the primary backend's error.
    pub async fn list(&self, query: D::Query) -> Result<Vec<D::Record>, FacadeError> {
        match self.run(OperationKind::List, Request::List(query)).await? {
            Response::Listed(records) => Ok(records),
            other => Err(unexpected(OperationKind::List, &other)),
        }
    }

    /// Wait for background comparisons, then for the recorder queue
    pub async fn quiesce(&self) {
        self.background.wait_idle().await;
        self.recorder.flush().await;
    }

    /// Comparisons still running in the background
    #[must_use]
    pub fn pending_comparisons(&self) -> usize {
        self.background.pending.load(Ordering::Acquire)
    }

    async fn run(&self, kind: OperationKind, request: Request<D>) -> Result<Response<D>, FacadeError> {
        self.execute(kind.default_method(), request).await
    }

    fn adapter(&self, backend: Backend) -> &Arc<dyn StoreAdapter<D>> {
        match backend {
            Backend::Legacy => &self.legacy,
            Backend::Target => &self.target,
        }
    }

    async fn single(&self, backend: Backend, request: Request<D>) -> Result<Response<D>, FacadeError> {
        dispatch(self.adapter(backend).as_ref(), request)
            .await
            .map_err(|e| {
                tracing::debug!(%backend, error = %e, "store call failed");
                FacadeError::primary(backend, e)
            })
    }

    /// Primary first; shadow only after primary success
    async fn dual_write(
        &self,
        operation: Operation,
        primary: Backend,
        shadow: Backend,
        request: Request<D>,
    ) -> Result<Response<D>, FacadeError> {
        let primary_response = dispatch(self.adapter(primary).as_ref(), request.clone())
            .await
            .map_err(|e| {
                tracing::warn!(backend = %primary, error = %e, "primary write failed; shadow skipped");
                FacadeError::primary(primary, e)
            })?;

        let shadow_call = dispatch(self.adapter(shadow).as_ref(), request);
        let comparison = match tokio::time::timeout(self.shadow_timeout, shadow_call).await {
            Ok(Ok(shadow_response)) => {
                compare_responses(&self.engine, &operation, primary, &primary_response, &shadow_response)
            }
            Ok(Err(e)) => {
                tracing::warn!(backend = %shadow, error = %e, "shadow write failed");
                shadow_failure(shadow, &e.to_string(), &primary_response)
            }
            Err(_) => {
                let reason = timeout_reason(self.shadow_timeout);
                tracing::warn!(backend = %shadow, %reason, "shadow write timed out");
                shadow_failure(shadow, &reason, &primary_response)
            }
        };

        self.recorder.record(&operation, comparison);
        Ok(primary_response)
    }

    /// Both concurrently; primary returned as soon as it lands
    async fn dual_read(
        &self,
        operation: Operation,
        primary: Backend,
        shadow: Backend,
        request: Request<D>,
    ) -> Result<Response<D>, FacadeError> {
        let guard = self.background.begin();
        let shadow_adapter = Arc::clone(self.adapter(shadow));
        let shadow_request = request.clone();
        let timeout = self.shadow_timeout;
        let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        let shadow_task = tokio::spawn(
            async move {
                tokio::time::timeout(timeout, dispatch(shadow_adapter.as_ref(), shadow_request)).await
            }
            .in_current_span(),
        );

        let primary_response = match dispatch(self.adapter(primary).as_ref(), request).await {
            Ok(response) => response,
            Err(e) => {
                shadow_task.abort();
                tracing::debug!(backend = %primary, error = %e, "primary read failed; nothing compared");
                return Err(FacadeError::primary(primary, e));
            }
        };

        let engine = Arc::clone(&self.engine);
        let recorder = Arc::clone(&self.recorder);
        let primary_copy = primary_response.clone();
        tokio::spawn(
            async move {
                let _guard = guard;
                let comparison = match shadow_task.await {
                    Ok(Ok(Ok(shadow_response))) => {
                        compare_responses(&engine, &operation, primary, &primary_copy, &shadow_response)
                    }
                    Ok(Ok(Err(e))) => {
                        tracing::warn!(backend = %shadow, error = %e, "shadow read failed");
                        shadow_failure(shadow, &e.to_string(), &primary_copy)
                    }
                    Ok(Err(_)) => {
                        tracing::warn!(
                            backend = %shadow,
                            timeout_ms,
                            "shadow read timed out; comparison skipped"
                        );
                        return;
                    }
                    Err(e) => {
                        tracing::warn!(backend = %shadow, error = %e, "shadow read task failed");
                        shadow_failure(shadow, &e.to_string(), &primary_copy)
                    }
                };
                recorder.record(&operation, comparison);
            }
            .in_current_span(),
        );

        Ok(primary_response)
    }
}

/// Run a request against one adapter
fn dispatch<'a, D: Domain>(
    adapter: &'a dyn StoreAdapter<D>,
    request: Request<D>,
) -> BoxFuture<'a, Result<Response<D>, AdapterError>> {
    async move {
        match request {
            Request::Create(draft) => adapter.create(draft).await.map(Response::Created),
            Request::Read(id) => adapter.read(&id).await.map(Response::Read),
            Request::Update(id, patch) => adapter.update(&id, patch).await.map(Response::Updated),
            Request::Delete(id) => adapter.delete(&id).await.map(|()| Response::Deleted),
            Request::List(query) => adapter.list(&query).await.map(Response::Listed),
        }
    }
    .boxed()
}

/// Orient primary/shadow as legacy/target and compare
fn compare_responses<D: Domain>(
    engine: &DiffEngine,
    operation: &Operation,
    primary: Backend,
    primary_response: &Response<D>,
    shadow_response: &Response<D>,
) -> ComparisonResult {
    let (legacy, target) = match primary {
        Backend::Legacy => (primary_response, shadow_response),
        Backend::Target => (shadow_response, primary_response),
    };
    match (legacy.to_json(), target.to_json()) {
        (Ok(legacy), Ok(target)) => engine.evaluate(operation, &legacy, &target),
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!(error = %e, "could not serialize results for comparison");
            DiffEngine::comparison_failure(&ComparisonError::from(e))
        }
    }
}

fn shadow_failure<D: Domain>(
    shadow: Backend,
    reason: &str,
    primary_response: &Response<D>,
) -> ComparisonResult {
    let available = primary_response.to_json().unwrap_or_default();
    DiffEngine::shadow_unavailable(shadow, reason, available)
}

fn timeout_reason(timeout: Duration) -> String {
    AdapterError::Timeout {
        timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
    }
    .to_string()
}

fn unexpected<D: Domain>(expected: OperationKind, got: &Response<D>) -> FacadeError {
    FacadeError::UnexpectedResponse {
        expected,
        actual: got.kind(),
    }
}

/// Count of in-flight background comparisons
#[derive(Debug, Default)]
struct Background {
    pending: AtomicUsize,
    idle: Notify,
}

impl Background {
    fn begin(self: &Arc<Self>) -> BackgroundGuard {
        self.pending.fetch_add(1, Ordering::AcqRel);
        BackgroundGuard(Arc::clone(self))
    }

    async fn wait_idle(&self) {
        loop {
            let idle = self.idle.notified();
            tokio::pin!(idle);
            idle.as_mut().enable();
            if self.pending.load(Ordering::Acquire) == 0 {
                return;
            }
            idle.await;
        }
    }
}

struct BackgroundGuard(Arc<Background>);

impl Drop for BackgroundGuard {
    fn drop(&mut self) {
        if self.0.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dualstore_core::Severity;
    use dualstore_diff::{ClassificationTable, ComparatorConfig, DiffComparator, SeverityClassifier};
    use dualstore_recorder::{InMemoryDiffStore, RecorderConfig};
    use dualstore_test_utils::{family_record, task_record, with_field, JsonDomain, ScriptedAdapter};
    use serde_json::json;

    struct Harness {
        legacy: Arc<ScriptedAdapter<JsonDomain>>,
        target: Arc<ScriptedAdapter<JsonDomain>>,
        controller: Arc<CutoverController>,
        store: Arc<InMemoryDiffStore>,
        facade: RepositoryFacade<JsonDomain>,
    }

    fn harness() -> Harness {
        let legacy = Arc::new(ScriptedAdapter::legacy());
        let target = Arc::new(ScriptedAdapter::target());
        let controller = Arc::new(CutoverController::new());
        let store = Arc::new(InMemoryDiffStore::new());
        let recorder = Arc::new(DiffRecorder::spawn(store.clone(), RecorderConfig::default()));
        let engine = DiffEngine::new(
            DiffComparator::new(ComparatorConfig::new()),
            SeverityClassifier::new(ClassificationTable::with_defaults()),
        );
        let facade = RepositoryFacade::new(
            legacy.clone(),
            target.clone(),
            controller.clone(),
            engine,
            recorder,
        )
        .with_shadow_timeout(Duration::from_millis(100));
        Harness {
            legacy,
            target,
            controller,
            store,
            facade,
        }
    }

    fn phase(h: &Harness, phase: CutoverPhase) {
        h.controller.force_phase(JsonDomain::NAME, "*", phase).unwrap();
    }

    #[tokio::test]
    async fn legacy_only_touches_legacy() {
        let h = harness();
        h.legacy
            .set_reply(OperationKind::Read, Ok(Response::Read(Some(task_record("t-1", "OPEN")))));

        let record = h.facade.read("t-1".into()).await.unwrap();
        assert_eq!(record.unwrap()["status"], "OPEN");
        assert_eq!(h.target.total_calls(), 0);
        h.facade.quiesce().await;
        assert!(h.store.is_empty());
    }

    #[tokio::test]
    async fn target_only_errors_propagate() {
        let h = harness();
        phase(&h, CutoverPhase::TargetOnly);
        h.target
            .set_reply(OperationKind::Delete, Err(AdapterError::not_found("t-1")));

        let err = h.facade.delete("t-1".into()).await.unwrap_err();
        assert_eq!(err.backend(), Some(Backend::Target));
        assert!(err.is_not_found());
        assert_eq!(h.legacy.total_calls(), 0);
    }

    #[tokio::test]
    async fn dual_read_divergence_is_recorded() {
        let h = harness();
        phase(&h, CutoverPhase::DualLegacyPrimary);
        let record = task_record("t-1", "OPEN");
        h.legacy
            .set_reply(OperationKind::Read, Ok(Response::Read(Some(record.clone()))));
        h.target.set_reply(
            OperationKind::Read,
            Ok(Response::Read(Some(with_field(&record, "title", json!("Other"))))),
        );

        let got = h.facade.read("t-1".into()).await.unwrap();
        assert_eq!(got, Some(record));
        h.facade.quiesce().await;

        let records = h.store.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].severity, Severity::Warning);
        assert_eq!(records[0].payload[0].field_path, "title");
    }

    #[tokio::test]
    async fn dual_create_minted_ids_are_info() {
        let h = harness();
        phase(&h, CutoverPhase::DualTargetPrimary);
        h.legacy.set_reply(
            OperationKind::Create,
            Ok(Response::Created(family_record("f-legacy", "Okafor"))),
        );
        h.target.set_reply(
            OperationKind::Create,
            Ok(Response::Created(family_record("f-target", "Okafor"))),
        );

        let created = h.facade.create(json!({"name": "Okafor"})).await.unwrap();
        assert_eq!(created["id"], "f-target");
        h.facade.quiesce().await;

        let records = h.store.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].severity, Severity::Info);
        assert_eq!(records[0].payload[0].field_path, "id");
    }

    #[tokio::test]
    async fn dual_read_primary_error_records_nothing() {
        let h = harness();
        phase(&h, CutoverPhase::DualTargetPrimary);
        h.target
            .set_reply(OperationKind::List, Err(AdapterError::network("reset")));
        h.legacy.set_reply(OperationKind::List, Ok(Response::Listed(vec![])));

        let err = h.facade.list(()).await.unwrap_err();
        assert_eq!(err.backend(), Some(Backend::Target));
        h.facade.quiesce().await;
        assert!(h.store.is_empty());
        assert_eq!(h.facade.pending_comparisons(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_shadow_read_does_not_delay_primary() {
        let legacy = Arc::new(
            ScriptedAdapter::<JsonDomain>::legacy()
                .with_delay(Duration::from_secs(10))
                .replying(OperationKind::Read, Ok(Response::Read(None))),
        );
        let h = harness();
        let facade = RepositoryFacade::new(
            legacy.clone(),
            h.target.clone(),
            h.controller.clone(),
            DiffEngine::default(),
            Arc::new(DiffRecorder::spawn(h.store.clone(), RecorderConfig::default())),
        )
        .with_shadow_timeout(Duration::from_millis(100));
        phase(&h, CutoverPhase::DualTargetPrimary);
        h.target.set_reply(OperationKind::Read, Ok(Response::Read(None)));

        let started = tokio::time::Instant::now();
        assert_eq!(facade.read("t-1".into()).await.unwrap(), None);
        assert!(started.elapsed() < Duration::from_millis(100));

        // Shadow times out: comparison skipped, nothing recorded
        facade.quiesce().await;
        assert!(h.store.is_empty());
        assert_eq!(legacy.calls(OperationKind::Read), 1);
    }
}
