//! Phone Task - run one AutoGLM phone task from the command line
//!
//! This is the CLI entry point for the phone-task tool.
//! Run with: cargo run --bin phone-task -- "打开设置"

use std::process::ExitCode;

use clap::Parser;
use phone_task_runner::Cli;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Load .env file if present (ignore errors if file doesn't exist)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Logs go to stderr so stdout only carries agent output and results
    let default_level = if cli.quiet { "warn" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    cli.run().await
}
