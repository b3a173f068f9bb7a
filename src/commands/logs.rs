// src/commands/logs.rs

use anyhow::{bail, Result};
use tracing::warn;

use crate::commands::open_store;
use crate::config::Config;
use crate::store::{TaskRun, WorkflowRun};

/// `wf logs <run_id> [task]`
pub async fn execute(config: &Config, run_id: &str, task: Option<&str>) -> Result<()> {
    let store = open_store(config).await?;

    let run = store.load_workflow_run(run_id).await?;
    let tasks = store.load_task_runs(run_id).await?;

    if tasks.is_empty() {
        println!("No tasks found for run '{run_id}'");
        return Ok(());
    }

    match task {
        Some(name) => show_task_logs(&run, &tasks, name),
        None => {
            show_run_logs(&run, &tasks);
            Ok(())
        }
    }
}

/// Display logs for all tasks in a run.
fn show_run_logs(run: &WorkflowRun, tasks: &[TaskRun]) {
    println!("=== Logs for Run '{}' ({}) ===\n", run.id, run.workflow);

    for task in tasks {
        let exit_code = task
            .exit_code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "N/A".to_string());
        println!(
            "[{}] Status: {} | Attempts: {} | Exit Code: {}",
            task.name, task.status, task.attempts, exit_code
        );

        if task.log_path.is_empty() {
            println!("  (No logs recorded)\n");
        } else {
            match std::fs::read_to_string(&task.log_path) {
                Ok(content) => println!("  {content}\n"),
                Err(err) => {
                    warn!(
                        run_id = %run.id,
                        task = %task.name,
                        file = %task.log_path,
                        error = %err,
                        "failed to read task log file"
                    );
                    println!("  (Could not read log file: {err})\n");
                }
            }
        }

        if !task.last_error.is_empty() {
            println!("  Last Error: {}\n", task.last_error);
        }
    }
}

/// Display logs for a single task.
fn show_task_logs(run: &WorkflowRun, tasks: &[TaskRun], name: &str) -> Result<()> {
    let Some(task) = tasks.iter().find(|t| t.name == name) else {
        bail!("task '{}' not found in run '{}'", name, run.id);
    };

    println!("=== Logs for Task '{}' in Run '{}' ===\n", name, run.id);
    println!("Status: {}", task.status);
    println!("Attempts: {}", task.attempts);
    println!("Started: {}", task.started_at.format("%Y-%m-%d %H:%M:%S"));

    if let Some(ended) = task.ended_at {
        println!("Ended: {}", ended.format("%Y-%m-%d %H:%M:%S"));
        let millis = (ended - task.started_at).num_milliseconds();
        println!("Duration: {:.2}s", millis as f64 / 1000.0);
    }

    if let Some(code) = task.exit_code {
        println!("Exit Code: {code}");
    }

    println!("\n--- Output ---");

    if task.log_path.is_empty() {
        println!("(No logs recorded)");
    } else {
        let content = std::fs::read_to_string(&task.log_path)
            .map_err(|err| anyhow::anyhow!("could not read log file for task '{name}': {err}"))?;
        println!("{content}");
    }

    if !task.last_error.is_empty() {
        println!("\n--- Error ---");
        println!("{}", task.last_error);
    }

    Ok(())
}
