//! Command implementations
//!
//! Each command writes its report to `out` and returns whether it passed;
//! `main` maps that to the exit code.

use crate::cli::{Cli, Command, CompareArgs, GateArgs, PhaseCommand, StatsArgs};
use anyhow::{bail, Context, Result};
use dualstore_core::{ComparisonResult, CutoverPhase, Operation};
use dualstore_cutover::{CutoverController, FilePhaseSource, PhaseSource};
use dualstore_diff::{DiffComparator, DiffEngine, SeverityClassifier};
use dualstore_facade::domains::{base_comparator, builtin_classification, comparator_for};
use dualstore_recorder::{DiffStats, JsonlDiffStore, ReleaseGate, StatsAggregator};
use serde_json::{json, Value};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

/// Run a parsed command line
///
/// # Errors
/// Returns an error for unreadable files, invalid input or refused phase
/// changes.
pub async fn run(cli: Cli, out: &mut impl Write) -> Result<bool> {
    match cli.command {
        Command::Phase(cmd) => phase(&cli.phase_file, cmd, out).await,
        Command::Stats(args) => stats(&cli.diff_log, &args, out).await,
        Command::Gate(args) => gate(&cli.diff_log, &args, out).await,
        Command::Compare(args) => compare(&args, out).await,
    }
}

async fn phase(path: &Path, cmd: PhaseCommand, out: &mut impl Write) -> Result<bool> {
    let source = FilePhaseSource::new(path);
    let table = source
        .load()
        .await
        .with_context(|| format!("loading phases from {}", path.display()))?;
    let controller = CutoverController::with_table(table);

    match cmd {
        PhaseCommand::List => {
            let entries = controller.entries();
            if entries.is_empty() {
                writeln!(out, "no phases configured; everything is {}", CutoverPhase::LegacyOnly)?;
            }
            for entry in entries {
                writeln!(out, "{:<16} {:<16} {}", entry.domain, entry.method, entry.phase)?;
            }
        }
        PhaseCommand::Get { domain, method } => {
            writeln!(out, "{}", controller.phase_for(&domain, &method))?;
        }
        PhaseCommand::Set {
            domain,
            method,
            phase,
            force,
        } => {
            let change = if force {
                controller.force_phase(&domain, &method, phase)
            } else {
                controller.set_phase(&domain, &method, phase)
            }
            .with_context(|| format!("setting {domain}.{method}"))?;

            source
                .save(&controller.snapshot())
                .await
                .with_context(|| format!("writing {}", path.display()))?;
            writeln!(out, "{domain}.{method}: {} -> {}", change.previous, change.current)?;
        }
    }
    Ok(true)
}

async fn load_stats(diff_log: &Path, days: u32, top: usize) -> Result<DiffStats> {
    let store = Arc::new(JsonlDiffStore::new(diff_log));
    StatsAggregator::new(store)
        .with_top_n(top)
        .stats_for(days)
        .await
        .with_context(|| format!("reading {}", diff_log.display()))
}

async fn stats(diff_log: &Path, args: &StatsArgs, out: &mut impl Write) -> Result<bool> {
    let stats = load_stats(diff_log, args.days, args.top).await?;
    if args.json {
        writeln!(out, "{}", serde_json::to_string_pretty(&stats)?)?;
        return Ok(true);
    }

    let s = &stats.severity_breakdown;
    writeln!(out, "last {} day(s): {} diffs", args.days, stats.total_diffs)?;
    writeln!(out, "  error   {}", s.error)?;
    writeln!(out, "  warning {}", s.warning)?;
    writeln!(out, "  info    {}", s.info)?;
    if !stats.top_endpoints.is_empty() {
        writeln!(out, "top endpoints:")?;
        for e in &stats.top_endpoints {
            writeln!(out, "  {:<32} {}", e.endpoint, e.count)?;
        }
    }
    Ok(true)
}

async fn gate(diff_log: &Path, args: &GateArgs, out: &mut impl Write) -> Result<bool> {
    let gate = ReleaseGate {
        window_days: args.days,
        max_errors: args.max_errors,
        max_warnings: args.max_warnings,
    };
    let stats = load_stats(diff_log, args.days, 0).await?;
    let decision = gate.evaluate(&stats);
    if decision.passed {
        writeln!(out, "gate passed: {} diffs in the last {} day(s)", stats.total_diffs, args.days)?;
    } else {
        for v in &decision.violations {
            writeln!(out, "gate failed: {v}")?;
        }
    }
    Ok(decision.passed)
}

async fn read_json(path: &Path) -> Result<Value> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

/// Exit status is 1 when the results diverge
async fn compare(args: &CompareArgs, out: &mut impl Write) -> Result<bool> {
    if args.domain.trim().is_empty() {
        bail!("--domain must not be empty");
    }
    let legacy = read_json(&args.legacy).await?;
    let target = read_json(&args.target).await?;

    let comparator = comparator_for(&args.domain).unwrap_or_else(|| {
        tracing::warn!(domain = %args.domain, "unknown domain; comparing with default rules");
        base_comparator()
    });
    let engine = DiffEngine::new(
        DiffComparator::new(comparator),
        SeverityClassifier::new(builtin_classification()),
    );
    let method = args
        .method
        .clone()
        .unwrap_or_else(|| args.kind.default_method().to_string());
    let operation = Operation::new(args.domain.clone(), method, args.kind);

    let report = match engine.evaluate(&operation, &legacy, &target) {
        ComparisonResult::Equivalent => json!({
            "endpoint": operation.endpoint(),
            "equivalent": true,
        }),
        ComparisonResult::Divergent { payload, severity } => json!({
            "endpoint": operation.endpoint(),
            "equivalent": false,
            "severity": severity,
            "diff": payload,
        }),
    };
    writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
    Ok(report["equivalent"] == json!(true))
}
