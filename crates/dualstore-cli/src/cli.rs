//! Command-line definition

use clap::{Args, Parser, Subcommand};
use dualstore_core::{CutoverPhase, OperationKind};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "dualstore", version, about = "Dual-store migration control")]
pub struct Cli {
    /// TOML file of `[[phases]]` rows
    #[arg(long, global = true, default_value = "dualstore-phases.toml")]
    pub phase_file: PathBuf,

    /// JSON Lines diff log
    #[arg(long, global = true, default_value = "dualstore-diffs.jsonl")]
    pub diff_log: PathBuf,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Inspect or change cutover phases
    #[command(subcommand)]
    Phase(PhaseCommand),

    /// Drift statistics over a trailing window
    Stats(StatsArgs),

    /// Fail (exit 1) when drift exceeds limits
    Gate(GateArgs),

    /// Compare two JSON result files offline
    Compare(CompareArgs),
}

#[derive(Debug, Subcommand)]
pub enum PhaseCommand {
    /// List configured rows
    List,

    /// Effective phase for a (domain, method)
    Get { domain: String, method: String },

    /// Advance a (domain, method); `*` as method sets the domain default
    Set {
        domain: String,
        method: String,
        phase: CutoverPhase,
        /// Allow moving backwards
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Args)]
pub struct StatsArgs {
    #[arg(long, default_value_t = 1)]
    pub days: u32,

    /// Print the stats object as JSON
    #[arg(long)]
    pub json: bool,

    /// Endpoints to show
    #[arg(long, default_value_t = dualstore_recorder::DEFAULT_TOP_ENDPOINTS)]
    pub top: usize,
}

#[derive(Debug, Args)]
pub struct GateArgs {
    #[arg(long, default_value_t = 1)]
    pub days: u32,

    #[arg(long, default_value_t = 0)]
    pub max_errors: u64,

    #[arg(long)]
    pub max_warnings: Option<u64>,
}

#[derive(Debug, Args)]
pub struct CompareArgs {
    /// Legacy result (JSON)
    pub legacy: PathBuf,

    /// Target result (JSON)
    pub target: PathBuf,

    #[arg(long)]
    pub domain: String,

    /// Defaults to the kind's method name
    #[arg(long)]
    pub method: Option<String>,

    #[arg(long, default_value = "read")]
    pub kind: OperationKind,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_phase_set() {
        let cli = Cli::try_parse_from([
            "dualstore",
            "phase",
            "set",
            "task",
            "*",
            "dual-legacy-primary",
            "--force",
        ])
        .unwrap();
        match cli.command {
            Command::Phase(PhaseCommand::Set {
                phase, force, ..
            }) => {
                assert_eq!(phase, CutoverPhase::DualLegacyPrimary);
                assert!(force);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_phase() {
        assert!(Cli::try_parse_from(["dualstore", "phase", "set", "task", "*", "halfway"]).is_err());
    }

    #[test]
    fn global_paths_after_subcommand() {
        let cli = Cli::try_parse_from(["dualstore", "stats", "--days", "7", "--diff-log", "x.jsonl"])
            .unwrap();
        assert_eq!(cli.diff_log, PathBuf::from("x.jsonl"));
    }
}
