use chrono::{TimeZone, Utc};
use dualstore_core::{
    AdapterError, Backend, CutoverPhase, DiffValue, OperationKind, Request, Response, Severity,
};
use dualstore_facade::domains::task::{NewTask, Task, TaskPatch, TaskStatus};
use dualstore_facade::domains::Tasks;
use dualstore_facade::{MigrationConfig, MigrationRuntime, RepositoryFacade};
use dualstore_recorder::InMemoryDiffStore;
use dualstore_recorder::ReleaseGate;
use dualstore_test_utils::{scripted_pair, ScriptedAdapter};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

fn task(status: TaskStatus) -> Task {
    Task {
        id: "t-1".into(),
        family_id: "f-1".into(),
        title: "Water the plants".into(),
        status,
        assignee_id: Some("u-2".into()),
        due_date: None,
        points: 3,
        updated_at: Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap(),
    }
}

struct Fixture {
    runtime: MigrationRuntime,
    store: Arc<InMemoryDiffStore>,
    legacy: Arc<ScriptedAdapter<Tasks>>,
    target: Arc<ScriptedAdapter<Tasks>>,
    facade: Arc<RepositoryFacade<Tasks>>,
}

fn fixture(phase: CutoverPhase, legacy: ScriptedAdapter<Tasks>, target: ScriptedAdapter<Tasks>) -> Fixture {
    let config = MigrationConfig {
        shadow_timeout_ms: 200,
        ..MigrationConfig::default()
    };
    let store = Arc::new(InMemoryDiffStore::new());
    let runtime = MigrationRuntime::with_store(config, store.clone()).unwrap();
    runtime.controller().set_phase("task", "*", phase).unwrap();

    let legacy = Arc::new(legacy);
    let target = Arc::new(target);
    let facade = runtime.facade::<Tasks>(legacy.clone(), target.clone());
    Fixture {
        runtime,
        store,
        legacy,
        target,
        facade,
    }
}

fn updated(record: Task) -> Result<Response<Tasks>, AdapterError> {
    Ok(Response::Updated(record))
}

#[tokio::test]
async fn dual_write_shadow_failure_still_succeeds_with_one_error_record() {
    let f = fixture(
        CutoverPhase::DualLegacyPrimary,
        ScriptedAdapter::legacy().replying(OperationKind::Update, updated(task(TaskStatus::Done))),
        ScriptedAdapter::target()
            .replying(OperationKind::Update, Err(AdapterError::network("connection reset"))),
    );

    let record = f
        .facade
        .update("t-1".into(), TaskPatch::default())
        .await
        .unwrap();
    assert_eq!(record.status, TaskStatus::Done);
    f.facade.quiesce().await;

    let records = f.store.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].severity, Severity::Error);
    assert!(matches!(records[0].payload[0].target, DiffValue::Unavailable(_)));
    assert!(matches!(records[0].payload[0].legacy, DiffValue::Present(_)));
}

#[tokio::test]
async fn dual_write_primary_failure_never_calls_shadow() {
    let f = fixture(
        CutoverPhase::DualLegacyPrimary,
        ScriptedAdapter::legacy()
            .replying(OperationKind::Create, Err(AdapterError::Rejected("title empty".into()))),
        ScriptedAdapter::target().replying(
            OperationKind::Create,
            Ok(Response::Created(task(TaskStatus::Open))),
        ),
    );

    let draft = NewTask {
        family_id: "f-1".into(),
        title: String::new(),
        assignee_id: None,
        due_date: None,
        points: 1,
    };
    let err = f.facade.create(draft).await.unwrap_err();
    assert_eq!(err.backend(), Some(Backend::Legacy));
    assert_eq!(f.target.total_calls(), 0);

    f.facade.quiesce().await;
    assert!(f.store.is_empty());
}

#[tokio::test]
async fn dual_read_equal_results_record_nothing() {
    let (legacy, target) =
        scripted_pair(OperationKind::Read, &Ok(Response::Read(Some(task(TaskStatus::Open)))));
    let f = fixture(CutoverPhase::DualLegacyPrimary, legacy, target);

    for _ in 0..5 {
        f.facade.read("t-1".into()).await.unwrap();
    }
    f.facade.quiesce().await;

    assert!(f.store.is_empty());
    assert_eq!(f.legacy.calls(OperationKind::Read), 5);
    assert_eq!(f.target.calls(OperationKind::Read), 5);
}

fn draft() -> NewTask {
    NewTask {
        family_id: "f-1".into(),
        title: "Water the plants".into(),
        assignee_id: Some("u-2".into()),
        due_date: None,
        points: 3,
    }
}

#[tokio::test]
async fn dual_create_with_backend_minted_ids_is_info() {
    let minted = |id: &str| -> Result<Response<Tasks>, AdapterError> {
        Ok(Response::Created(Task {
            id: id.into(),
            ..task(TaskStatus::Open)
        }))
    };
    let f = fixture(
        CutoverPhase::DualLegacyPrimary,
        ScriptedAdapter::legacy().replying(OperationKind::Create, minted("legacy-17")),
        ScriptedAdapter::target().replying(OperationKind::Create, minted("01HZX-uuid")),
    );

    let created = f.facade.create(draft()).await.unwrap();
    assert_eq!(created.id, "legacy-17");
    assert_eq!(f.target.calls(OperationKind::Create), 1);
    f.facade.quiesce().await;

    let records = f.store.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].severity, Severity::Info);
    assert_eq!(records[0].payload.len(), 1);
    assert_eq!(records[0].payload[0].field_path, "id");
    assert!(f.runtime.check_gate(&ReleaseGate::default()).await.unwrap().passed);
}

#[tokio::test]
async fn dual_create_with_diverging_status_is_error() {
    let f = fixture(
        CutoverPhase::DualTargetPrimary,
        ScriptedAdapter::legacy()
            .replying(OperationKind::Create, Ok(Response::Created(task(TaskStatus::Open)))),
        ScriptedAdapter::target()
            .replying(OperationKind::Create, Ok(Response::Created(task(TaskStatus::Done)))),
    );

    let created = f.facade.create(draft()).await.unwrap();
    assert_eq!(created.status, TaskStatus::Done);
    f.facade.quiesce().await;

    let records = f.store.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].severity, Severity::Error);
    assert_eq!(records[0].payload[0].field_path, "status");
}

#[tokio::test]
async fn dual_read_shadow_error_records_one_error() {
    let f = fixture(
        CutoverPhase::DualLegacyPrimary,
        ScriptedAdapter::legacy()
            .replying(OperationKind::Read, Ok(Response::Read(Some(task(TaskStatus::Open))))),
        ScriptedAdapter::target()
            .replying(OperationKind::Read, Err(AdapterError::network("connection refused"))),
    );

    let got = f.facade.read("t-1".into()).await.unwrap().unwrap();
    assert_eq!(got.status, TaskStatus::Open);
    f.facade.quiesce().await;

    let records = f.store.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].severity, Severity::Error);
    assert_eq!(records[0].payload.len(), 1);
    assert!(matches!(
        &records[0].payload[0].target,
        DiffValue::Unavailable(reason) if reason.contains("connection refused")
    ));
    assert!(matches!(records[0].payload[0].legacy, DiffValue::Present(_)));
}

#[tokio::test(start_paused = true)]
async fn cancelled_caller_does_not_cancel_comparison() {
    let f = fixture(
        CutoverPhase::DualLegacyPrimary,
        ScriptedAdapter::legacy()
            .replying(OperationKind::Read, Ok(Response::Read(Some(task(TaskStatus::Open))))),
        ScriptedAdapter::target()
            .with_delay(Duration::from_millis(50))
            .replying(OperationKind::Read, Ok(Response::Read(Some(task(TaskStatus::Done))))),
    );

    let (tx, rx) = tokio::sync::oneshot::channel();
    let facade = Arc::clone(&f.facade);
    let caller = tokio::spawn(async move {
        let got = facade.read("t-1".into()).await;
        let _ = tx.send(got);
        std::future::pending::<()>().await;
    });

    let got = rx.await.unwrap().unwrap().unwrap();
    assert_eq!(got.status, TaskStatus::Open);
    assert_eq!(f.facade.pending_comparisons(), 1);
    caller.abort();
    assert!(caller.await.unwrap_err().is_cancelled());

    f.facade.quiesce().await;
    let records = f.store.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].payload[0].field_path, "status");
}

#[tokio::test]
async fn target_primary_write_with_failing_legacy() {
    let f = fixture(
        CutoverPhase::DualTargetPrimary,
        ScriptedAdapter::legacy()
            .replying(OperationKind::Update, Err(AdapterError::Backend("legacy exploded".into()))),
        ScriptedAdapter::target().replying(OperationKind::Update, updated(task(TaskStatus::Done))),
    );

    let record = f
        .facade
        .execute("complete", Request::Update("t-1".into(), TaskPatch::default()))
        .await
        .unwrap();
    assert!(matches!(record, Response::Updated(ref t) if t.status == TaskStatus::Done));
    f.facade.quiesce().await;

    let records = f.store.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].endpoint(), "task.complete");
    assert_eq!(records[0].severity, Severity::Error);
    assert!(matches!(
        &records[0].payload[0].legacy,
        DiffValue::Unavailable(reason) if reason.contains("legacy exploded")
    ));
}

#[tokio::test(start_paused = true)]
async fn shadow_write_timeout_is_recorded() {
    let f = fixture(
        CutoverPhase::DualLegacyPrimary,
        ScriptedAdapter::legacy().replying(OperationKind::Delete, Ok(Response::Deleted)),
        ScriptedAdapter::target()
            .with_delay(Duration::from_secs(30))
            .replying(OperationKind::Delete, Ok(Response::Deleted)),
    );

    f.facade.delete("t-1".into()).await.unwrap();
    f.facade.quiesce().await;

    let records = f.store.records();
    assert_eq!(records.len(), 1);
    assert!(matches!(
        &records[0].payload[0].target,
        DiffValue::Unavailable(reason) if reason.contains("timed out")
    ));
}

#[tokio::test]
async fn critical_field_divergence_on_read() {
    let f = fixture(
        CutoverPhase::DualLegacyPrimary,
        ScriptedAdapter::legacy()
            .replying(OperationKind::Read, Ok(Response::Read(Some(task(TaskStatus::Done))))),
        ScriptedAdapter::target()
            .replying(OperationKind::Read, Ok(Response::Read(Some(task(TaskStatus::Open))))),
    );

    let got = f.facade.read("t-1".into()).await.unwrap().unwrap();
    assert_eq!(got.status, TaskStatus::Done);
    f.facade.quiesce().await;

    let records = f.store.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].severity, Severity::Error);
    assert_eq!(records[0].payload[0].field_path, "status");
}

#[tokio::test]
async fn record_missing_on_target_is_error() {
    let f = fixture(
        CutoverPhase::DualLegacyPrimary,
        ScriptedAdapter::legacy()
            .replying(OperationKind::Read, Ok(Response::Read(Some(task(TaskStatus::Open))))),
        ScriptedAdapter::target().replying(OperationKind::Read, Ok(Response::Read(None))),
    );

    f.facade.read("t-1".into()).await.unwrap();
    f.facade.quiesce().await;

    let records = f.store.records();
    assert_eq!(records[0].payload[0].field_path, "$");
    assert_eq!(records[0].severity, Severity::Error);
}

#[tokio::test]
async fn unconfigured_method_stays_on_legacy() {
    let f = fixture(
        CutoverPhase::LegacyOnly,
        ScriptedAdapter::legacy().replying(OperationKind::List, Ok(Response::Listed(vec![]))),
        ScriptedAdapter::target(),
    );
    assert_eq!(f.facade.phase_for("list"), CutoverPhase::LegacyOnly);
    assert!(f.facade.list(Default::default()).await.unwrap().is_empty());
    assert_eq!(f.target.total_calls(), 0);
}

#[tokio::test]
async fn phase_change_takes_effect_on_next_call() {
    let reply = Ok(Response::Read(Some(task(TaskStatus::Open))));
    let f = fixture(
        CutoverPhase::LegacyOnly,
        ScriptedAdapter::legacy().replying(OperationKind::Read, reply.clone()),
        ScriptedAdapter::target().replying(OperationKind::Read, reply),
    );

    f.facade.read("t-1".into()).await.unwrap();
    f.runtime
        .controller()
        .set_phase("task", "read", CutoverPhase::TargetOnly)
        .unwrap();
    f.facade.read("t-1".into()).await.unwrap();

    assert_eq!(f.legacy.calls(OperationKind::Read), 1);
    assert_eq!(f.target.calls(OperationKind::Read), 1);
}
