use clap::Parser;
use dualstore_cli::{run, Cli};
use dualstore_core::{ComparisonResult, DiffEntry, DiffRecord, DiffValue, Operation, OperationKind, Severity};
use dualstore_recorder::{DiffStore, JsonlDiffStore};
use serde_json::{json, Value};
use std::path::Path;

async fn exec(args: &[&str]) -> (bool, String) {
    let cli = Cli::try_parse_from(std::iter::once("dualstore").chain(args.iter().copied())).unwrap();
    let mut out = Vec::new();
    let passed = run(cli, &mut out).await.unwrap();
    (passed, String::from_utf8(out).unwrap())
}

async fn seed(log: &Path, severities: &[Severity]) {
    let store = JsonlDiffStore::new(log);
    let op = Operation::of_kind("task", OperationKind::Update);
    for severity in severities {
        let entry = DiffEntry::new(
            "title",
            DiffValue::Present(json!("a")),
            DiffValue::Present(json!("b")),
        );
        let record =
            DiffRecord::from_comparison(&op, ComparisonResult::divergent(vec![entry], *severity))
                .unwrap();
        store.append(&record).await.unwrap();
    }
}

#[tokio::test]
async fn phase_set_persists_and_refuses_regression() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("phases.toml");
    let file = file.to_str().unwrap();

    let (ok, out) = exec(&["--phase-file", file, "phase", "set", "task", "*", "dual_target_primary"]).await;
    assert!(ok);
    assert_eq!(out.trim(), "task.*: legacy_only -> dual_target_primary");

    let (_, out) = exec(&["--phase-file", file, "phase", "get", "task", "complete"]).await;
    assert_eq!(out.trim(), "dual_target_primary");

    let cli = Cli::try_parse_from([
        "dualstore", "--phase-file", file, "phase", "set", "task", "*", "legacy-only",
    ])
    .unwrap();
    let err = run(cli, &mut Vec::new()).await.unwrap_err();
    assert!(format!("{err:#}").contains("task"));

    let (ok, out) = exec(&["--phase-file", file, "phase", "set", "task", "*", "legacy-only", "--force"]).await;
    assert!(ok);
    assert_eq!(out.trim(), "task.*: dual_target_primary -> legacy_only");
}

#[tokio::test]
async fn phase_list_on_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("none.toml");
    let (ok, out) = exec(&["--phase-file", file.to_str().unwrap(), "phase", "list"]).await;
    assert!(ok);
    assert!(out.contains("legacy_only"));
}

#[tokio::test]
async fn stats_json_counts_by_severity() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("diffs.jsonl");
    seed(&log, &[Severity::Info, Severity::Info, Severity::Warning]).await;

    let (ok, out) = exec(&["--diff-log", log.to_str().unwrap(), "stats", "--json"]).await;
    assert!(ok);
    let stats: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(stats["total_diffs"], 3);
    assert_eq!(stats["severity_breakdown"]["info"], 2);
    assert_eq!(stats["severity_breakdown"]["warning"], 1);
    assert_eq!(stats["top_endpoints"][0]["endpoint"], "task.update");
}

#[tokio::test]
async fn gate_fails_on_error_diffs() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("diffs.jsonl");
    let log = log.to_str().unwrap();

    let (ok, _) = exec(&["--diff-log", log, "gate"]).await;
    assert!(ok, "empty log passes");

    seed(Path::new(log), &[Severity::Warning, Severity::Error]).await;
    let (ok, out) = exec(&["--diff-log", log, "gate"]).await;
    assert!(!ok);
    assert!(out.contains("gate failed"));

    let (ok, _) = exec(&["--diff-log", log, "gate", "--max-errors", "1"]).await;
    assert!(ok);
    let (ok, _) = exec(&["--diff-log", log, "gate", "--max-errors", "1", "--max-warnings", "0"]).await;
    assert!(!ok);
}

#[tokio::test]
async fn compare_reports_divergence() {
    let dir = tempfile::tempdir().unwrap();
    let legacy = dir.path().join("legacy.json");
    let target = dir.path().join("target.json");
    tokio::fs::write(&legacy, r#"{"id":"t-1","status":"DONE","updated_at":"2026-01-01T00:00:00Z"}"#)
        .await
        .unwrap();
    tokio::fs::write(&target, r#"{"id":"t-1","status":"TODO","updated_at":"2026-01-02T00:00:00Z"}"#)
        .await
        .unwrap();

    let (ok, out) = exec(&[
        "compare",
        legacy.to_str().unwrap(),
        target.to_str().unwrap(),
        "--domain",
        "task",
    ])
    .await;
    assert!(!ok);
    let report: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(report["endpoint"], "task.read");
    assert_eq!(report["severity"], "error");
    assert_eq!(report["diff"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn compare_equal_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("same.json");
    tokio::fs::write(&path, r#"[{"id":"a","grams":10}]"#).await.unwrap();
    let path = path.to_str().unwrap();

    let (ok, out) = exec(&["compare", path, path, "--domain", "meal", "--kind", "list"]).await;
    assert!(ok);
    assert!(out.contains("\"equivalent\": true"));
}
