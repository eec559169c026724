//! Administrative command handlers

use anyhow::Result;
use colored::*;
use pilot_client::PilotClient;
use pilot_core::dto::status::CoordinatorStatus;

use crate::config::Config;

pub async fn show_status(config: &Config) -> Result<()> {
    let client = PilotClient::new(&config.coordinator_url);
    let status = client.status().await?;
    print_status(&status);
    Ok(())
}

pub async fn set_exit_flag(config: &Config) -> Result<()> {
    let client = PilotClient::new(&config.coordinator_url);
    let status = client.set_exit_flag().await?;

    println!("{}", "✓ Exit flag raised".green().bold());
    print_status(&status);
    Ok(())
}

pub async fn close_submissions(config: &Config) -> Result<()> {
    let client = PilotClient::new(&config.coordinator_url);
    let status = client.close_submissions().await?;

    println!("{}", "✓ Submissions closed".green().bold());
    if !status.exit_flag {
        println!(
            "{}",
            "  Workers exit once the remaining tasks finish.".dimmed()
        );
    }
    print_status(&status);
    Ok(())
}

fn print_status(status: &CoordinatorStatus) {
    let flag = |set: bool| if set { "yes".red() } else { "no".green() };

    println!("{}", "Coordinator".bold());
    println!("  Exit flag:    {}", flag(status.exit_flag));
    println!("  Closed:       {}", flag(status.submissions_closed));
    println!("  Workers:      {}", status.workers);
    println!("  Queue depth:  {}", status.queue_depth);
    println!(
        "  Tasks:        {} pending, {} assigned, {} done, {} failed",
        status.tasks.pending.to_string().yellow(),
        status.tasks.assigned.to_string().cyan(),
        status.tasks.done.to_string().green(),
        status.tasks.failed.to_string().red()
    );
}
