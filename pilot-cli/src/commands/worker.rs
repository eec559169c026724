//! Worker command handlers
//!
//! Lists and evicts pilot workers.

use anyhow::Result;
use clap::Subcommand;
use colored::*;
use pilot_client::PilotClient;
use pilot_core::domain::worker::WorkerSummary;

use crate::config::Config;

/// Worker subcommands
#[derive(Subcommand)]
pub enum WorkerCommands {
    /// List all registered workers
    List,
    /// Force-unregister a worker; its task goes back to the queue
    Evict {
        /// Worker kind
        kind: String,
        /// Worker name
        name: String,
    },
}

/// Handle worker commands
pub async fn handle_worker_command(command: WorkerCommands, config: &Config) -> Result<()> {
    let client = PilotClient::new(&config.coordinator_url);

    match command {
        WorkerCommands::List => list_workers(&client).await,
        WorkerCommands::Evict { kind, name } => evict_worker(&client, &kind, &name).await,
    }
}

/// List all registered workers
async fn list_workers(client: &PilotClient) -> Result<()> {
    let workers = client.list_workers().await?;

    if workers.is_empty() {
        println!("{}", "No workers registered.".yellow());
    } else {
        println!(
            "{}",
            format!("Found {} registered worker(s):", workers.len()).bold()
        );
        println!();
        for worker in workers {
            print_worker_summary(&worker);
        }
    }

    Ok(())
}

async fn evict_worker(client: &PilotClient, kind: &str, name: &str) -> Result<()> {
    client.evict_worker(kind, name).await?;
    println!("{}", format!("✓ Worker {}/{} evicted", kind, name).green());
    Ok(())
}

/// Print a worker summary
fn print_worker_summary(worker: &WorkerSummary) {
    let id = &worker.process_id;

    println!("  {} Worker {}", "▸".cyan(), id.key().to_string().bold());
    println!("    Host:       {} (pid {})", id.hostname, id.pid);
    if id.batch_job_id != 0 {
        println!("    Batch job:  {}", id.batch_job_id);
    }
    match &worker.assigned_task {
        Some(task_id) => println!("    Task:       {}", task_id.cyan()),
        None => println!("    Task:       {}", "idle".dimmed()),
    }
    println!("    Completed:  {}", worker.tasks_completed);
    println!(
        "    Registered: {}",
        worker
            .registered_at
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .dimmed()
    );
    println!(
        "    Last Seen:  {}",
        worker
            .last_seen_at
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .dimmed()
    );
    println!();
}
