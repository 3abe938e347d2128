//! `tasks` -- terminal client for the tasks service.
//!
//! # Usage
//!
//! ```bash
//! # Against the default http://localhost:8080/api/tasks
//! tasks list --filter incompleted
//!
//! # Another server, via flag or environment variable
//! tasks --api-url http://tasks.internal/api/tasks add "Pay rent"
//! TASKS_API_URL=http://tasks.internal/api/tasks tasks toggle 3
//! ```

use std::process::ExitCode;

use clap::Parser;
use tasks_cli::{run, Cli, CliError, Config, UreqTransport};
use tasks_core::TaskStore;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::load(&cli.settings) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(base_url = %config.client.base_url, "using tasks API");

    let store = TaskStore::new(&config.client, UreqTransport::new(config.client.timeout));
    let mut stdout = std::io::stdout().lock();

    match run(&store, cli.command, &mut stdout).await {
        Ok(()) => ExitCode::SUCCESS,
        // The error page has already been written.
        Err(CliError::Api(_)) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
