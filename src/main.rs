// Entrypoint for the upload tool.
// - Keeps `main` small: parse options, install logging, hand over to
//   `upload::run`.
// - Fatal errors are printed once and mapped to a non-zero exit status;
//   per-file failures only show up in the summary.

use clap::Parser;
use dicom_upload::config::log_directive;
use dicom_upload::{run, ui, Cli};
use std::io::IsTerminal;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG, when set, takes precedence over --verbose.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_directive(cli.verbose)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr)
        .init();

    // Validation happens before anything touches the disk or the network.
    let result = cli.into_config().and_then(|config| run(&config));
    match result {
        Ok(report) => {
            ui::print_summary(&report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::from(e.exit_code())
        }
    }
}
