//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod admin;
mod task;
mod worker;

pub use task::TaskCommands;
pub use worker::WorkerCommands;

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Task submission and inspection
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },
    /// Worker pool management
    Worker {
        #[command(subcommand)]
        command: WorkerCommands,
    },
    /// Show coordinator status
    Status,
    /// Raise the exit flag: all workers leave on their next poll
    Exit,
    /// Stop accepting tasks; workers exit once all tasks are finished
    Close,
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Task { command } => task::handle_task_command(command, config).await,
        Commands::Worker { command } => worker::handle_worker_command(command, config).await,
        Commands::Status => admin::show_status(config).await,
        Commands::Exit => admin::set_exit_flag(config).await,
        Commands::Close => admin::close_submissions(config).await,
    }
}
