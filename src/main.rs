//! `tabver` binary entry point.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use tabver::cli::{self, Cli};
use tabver::config::Settings;
use tabver::orchestrator::Orchestrator;
use tabver::TabverError;

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let settings = Settings::from_env();
    let mut orchestrator = Orchestrator::new(settings);

    if let Err(err) = cli::run(cli, &mut orchestrator) {
        match err {
            TabverError::Unimplemented(operation) => {
                eprintln!("'{operation}' is still a skeleton: the engine does not implement it yet.");
            }
            other => eprintln!("error: {other}"),
        }
        std::process::exit(1);
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}
