use clap::Parser;
use dirsort::cli::{Cli, run_cli};
use dirsort::logging::setup_logging;
use dirsort::output::OutputFormatter;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let _guard = match setup_logging(cli.verbose, cli.log_file.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            OutputFormatter::error(&format!("{e:#}"));
            return ExitCode::FAILURE;
        }
    };

    // Per-entry failures are reported in the summary and still exit 0.
    match run_cli(&cli) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            OutputFormatter::error(&format!("Error: {e:#}"));
            ExitCode::FAILURE
        }
    }
}
