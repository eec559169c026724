//! Pilot CLI
//!
//! Driver for the pilot coordinator: submit tasks, wait for results and
//! manage the worker pool.

mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;

#[derive(Parser)]
#[command(name = "pilot")]
#[command(about = "Pilot job coordinator CLI", long_about = None)]
struct Cli {
    /// Coordinator URL
    #[arg(
        long,
        env = "PILOT_COORDINATOR_URL",
        default_value = "http://localhost:8080"
    )]
    coordinator_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config {
        coordinator_url: cli.coordinator_url,
    };

    handle_command(cli.command, &config).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_submit() {
        let cli = Cli::try_parse_from([
            "pilot",
            "--coordinator-url",
            "http://node-0:8080",
            "task",
            "submit",
            "sum",
            "1",
            "2",
            "--kwarg",
            "scale=3",
            "--kind",
            "cpu",
        ])
        .unwrap();

        assert_eq!(cli.coordinator_url, "http://node-0:8080");
        assert!(matches!(cli.command, Commands::Task { .. }));
    }
}
