//! Task command handlers
//!
//! Handles submitting tasks, inspecting them and waiting for results.

use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::Subcommand;
use colored::*;
use pilot_client::PilotClient;
use pilot_core::codec::{Call, Codec, JsonCodec};
use pilot_core::domain::task::{TaskDefn, TaskSnapshot, TaskState};
use serde_json::Value;

use crate::config::Config;

/// Task subcommands
#[derive(Subcommand)]
pub enum TaskCommands {
    /// Submit a task calling a registered function
    Submit {
        /// Function name (e.g. echo, sum, sleep, shell)
        function: String,

        /// Positional arguments, parsed as JSON when possible
        #[arg(allow_hyphen_values = true)]
        args: Vec<String>,

        /// Keyword argument as key=value (repeatable)
        #[arg(long = "kwarg", value_parser = parse_kwarg)]
        kwargs: Vec<(String, Value)>,

        /// Only workers of this kind may run the task
        #[arg(long, default_value = "")]
        kind: String,

        /// Task ID (generated when omitted)
        #[arg(long)]
        id: Option<String>,
    },
    /// Get task details
    Get {
        /// Task ID
        id: String,
    },
    /// List all tasks
    List,
    /// Wait until a task finishes and print its result
    Wait {
        /// Task ID
        id: String,

        /// Give up after this many seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Poll interval in milliseconds
        #[arg(long, default_value_t = 500)]
        interval: u64,
    },
}

/// Handle task commands
pub async fn handle_task_command(command: TaskCommands, config: &Config) -> Result<()> {
    let client = PilotClient::new(&config.coordinator_url);

    match command {
        TaskCommands::Submit {
            function,
            args,
            kwargs,
            kind,
            id,
        } => submit_task(&client, build_call(function, &args, kwargs), kind, id).await,
        TaskCommands::Get { id } => get_task(&client, &id).await,
        TaskCommands::List => list_tasks(&client).await,
        TaskCommands::Wait {
            id,
            timeout,
            interval,
        } => {
            wait_task(
                &client,
                &id,
                timeout.map(Duration::from_secs),
                Duration::from_millis(interval),
            )
            .await
        }
    }
}

/// Submit a new task
async fn submit_task(
    client: &PilotClient,
    call: Call,
    kind: String,
    id: Option<String>,
) -> Result<()> {
    let task_id = id.unwrap_or_else(TaskDefn::generate_id);
    let task = JsonCodec
        .encode_call(&call)
        .context("Failed to encode call")?
        .into_task(task_id, kind);

    let snapshot = client.submit_task(&task).await?;

    println!("{}", "✓ Task submitted".green().bold());
    println!("  ID:       {}", snapshot.task_id.bold());
    println!("  Function: {}", call.function);
    if !snapshot.kind.is_empty() {
        println!("  Kind:     {}", snapshot.kind);
    }

    Ok(())
}

/// Get and display a single task
async fn get_task(client: &PilotClient, id: &str) -> Result<()> {
    let snapshot = client.get_task(id).await?;
    print_task_details(&snapshot);
    Ok(())
}

/// List all tasks
async fn list_tasks(client: &PilotClient) -> Result<()> {
    let tasks = client.list_tasks().await?;

    if tasks.is_empty() {
        println!("{}", "No tasks found.".yellow());
    } else {
        println!("{}", format!("Found {} task(s):", tasks.len()).bold());
        println!();
        for task in tasks {
            print_task_summary(&task);
        }
    }

    Ok(())
}

/// Poll a task until it is DONE or FAILED
async fn wait_task(
    client: &PilotClient,
    id: &str,
    timeout: Option<Duration>,
    interval: Duration,
) -> Result<()> {
    let started = Instant::now();

    let snapshot = loop {
        let snapshot = client.get_task(id).await?;
        if snapshot.state.is_terminal() {
            break snapshot;
        }

        if timeout.is_some_and(|limit| started.elapsed() >= limit) {
            bail!(
                "Task {} still {} after {:?}",
                id,
                snapshot.state,
                started.elapsed()
            );
        }

        tokio::time::sleep(interval).await;
    };

    print_task_details(&snapshot);

    if snapshot.state == TaskState::Failed {
        bail!("Task {} failed", id);
    }

    Ok(())
}

// =============================================================================
// Argument Parsing
// =============================================================================

/// Parse an argument as JSON, falling back to a plain string
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn parse_kwarg(raw: &str) -> std::result::Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))?;

    if key.trim().is_empty() {
        return Err(format!("empty keyword in '{}'", raw));
    }

    Ok((key.trim().to_string(), parse_value(value)))
}

fn build_call(function: String, args: &[String], kwargs: Vec<(String, Value)>) -> Call {
    let call = args
        .iter()
        .fold(Call::new(function), |call, arg| call.arg(parse_value(arg)));

    kwargs
        .into_iter()
        .fold(call, |call, (key, value)| call.kwarg(key, value))
}

// =============================================================================
// Output
// =============================================================================

fn print_task_summary(task: &TaskSnapshot) {
    println!("  {} Task {}", "▸".cyan(), task.task_id.bold());
    println!("    State:    {}", colorize_state(task.state));
    if let Some(worker) = &task.assigned_to {
        println!("    Worker:   {}", worker.key().to_string().dimmed());
    }
    println!();
}

fn print_task_details(task: &TaskSnapshot) {
    println!("{}", format!("Task {}", task.task_id).bold());
    println!("  State:     {}", colorize_state(task.state));
    if !task.kind.is_empty() {
        println!("  Kind:      {}", task.kind);
    }
    println!("  Attempts:  {}", task.attempts);
    println!(
        "  Submitted: {}",
        task.submitted_at
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .dimmed()
    );
    if let Some(worker) = &task.assigned_to {
        println!("  Worker:    {}", worker);
    }
    if let Some(completed_at) = task.completed_at {
        println!(
            "  Completed: {}",
            completed_at.format("%Y-%m-%d %H:%M:%S").to_string().dimmed()
        );
    }

    let Some(result) = &task.result else {
        return;
    };

    if result.success {
        let bytes = result.return_value.as_deref().unwrap_or_default();
        match JsonCodec.decode_value(bytes) {
            Ok(value) => println!("  Result:    {}", value.to_string().green()),
            Err(_) => println!("  Result:    {} bytes (not JSON)", bytes.len()),
        }
    } else {
        println!(
            "  Error:     {} {}",
            result.error_id.as_deref().unwrap_or("Error").red().bold(),
            result.error.as_deref().unwrap_or_default()
        );
        println!("  Reported by {}", result.process_id.key().to_string().dimmed());
    }
}

/// Colorize task state for display
fn colorize_state(state: TaskState) -> ColoredString {
    let text = state.to_string();
    match state {
        TaskState::Pending => text.yellow(),
        TaskState::Assigned => text.cyan(),
        TaskState::Done => text.green(),
        TaskState::Failed => text.red(),
    }
}
