// src/commands/runs.rs

use anyhow::Result;

use crate::commands::open_store;
use crate::config::Config;
use crate::store::{RunStatus, WorkflowRun};

/// `wf runs [--workflow] [--status] [--limit] [--offset] [--json]`
pub async fn execute(
    config: &Config,
    workflow: &str,
    status: &str,
    limit: i64,
    offset: i64,
    json: bool,
) -> Result<()> {
    let store = open_store(config).await?;
    let runs = store.list_runs(workflow, status, limit, offset).await?;

    if runs.is_empty() {
        println!("No runs found");
        return Ok(());
    }

    if json {
        print_runs_json(&runs)
    } else {
        print_runs_table(&runs);
        Ok(())
    }
}

fn print_runs_table(runs: &[WorkflowRun]) {
    println!(
        "{:<36}  {:<20}  {:<11}  {:<19}  {:>8}",
        "RUN ID", "WORKFLOW", "STATUS", "STARTED AT", "DURATION"
    );
    println!(
        "{:<36}  {:<20}  {:<11}  {:<19}  {:>8}",
        "------", "--------", "------", "----------", "--------"
    );

    for run in runs {
        let duration = match run.ended_at {
            Some(ended) => {
                let millis = (ended - run.started_at).num_milliseconds();
                format!("{:.2}s", millis as f64 / 1000.0)
            }
            None => "-".to_string(),
        };

        println!(
            "{:<36}  {:<20}  {:<11}  {:<19}  {:>8}",
            run.id,
            run.workflow,
            colorise_status(run.status),
            run.started_at.format("%Y-%m-%d %H:%M:%S"),
            duration,
        );
    }
}

fn print_runs_json(runs: &[WorkflowRun]) -> Result<()> {
    for run in runs {
        println!("{}", serde_json::to_string_pretty(run)?);
    }
    Ok(())
}

fn colorise_status(status: RunStatus) -> String {
    match status {
        RunStatus::Success => format!("✓ {status}"),
        RunStatus::Failed => format!("✗ {status}"),
        RunStatus::Running => format!("⟳ {status}"),
        _ => status.to_string(),
    }
}
