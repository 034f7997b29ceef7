use clap::Parser;
use dualstore_cli::{run, Cli};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = dualstore_facade::telemetry::init_tracing(cli.log_json) {
        eprintln!("failed to initialise logging: {e}");
    }

    let mut stdout = std::io::stdout().lock();
    match run(cli, &mut stdout).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}
