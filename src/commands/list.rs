// src/commands/list.rs

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, warn};

use crate::commands::open_store;
use crate::config::Config;
use crate::dag::loader;
use crate::store::{RunStatus, Store};

/// Metadata about a single workflow file.
#[derive(Debug, Serialize)]
struct WorkflowInfo {
    name: String,
    tasks: usize,
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_run: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    total_runs: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    success_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    failed_count: Option<usize>,
}

/// `wf list [--json] [--detailed]`
pub async fn execute(config: &Config, json: bool, detailed: bool) -> Result<()> {
    let names = loader::workflow_names(&config.paths.workflows)
        .context("reading workflows directory")?;

    if names.is_empty() {
        println!("No workflows found in {}", config.paths.workflows.display());
        return Ok(());
    }

    let store = if detailed {
        Some(open_store(config).await?)
    } else {
        None
    };

    let mut workflows = Vec::with_capacity(names.len());
    for name in names {
        let mut info = match loader::load(&config.paths.workflows, &name) {
            Ok(graph) => WorkflowInfo {
                name: name.clone(),
                tasks: graph.len(),
                valid: true,
                last_run: None,
                total_runs: None,
                success_count: None,
                failed_count: None,
            },
            Err(err) => {
                warn!(workflow = %name, error = %err, "failed to load workflow definition");
                WorkflowInfo {
                    name: name.clone(),
                    tasks: 0,
                    valid: false,
                    last_run: None,
                    total_runs: None,
                    success_count: None,
                    failed_count: None,
                }
            }
        };

        if let Some(store) = &store {
            apply_run_stats(store, &mut info).await?;
        }

        workflows.push(info);
    }

    debug!(count = workflows.len(), "listing available workflows");

    if json {
        println!("{}", serde_json::to_string_pretty(&workflows)?);
        return Ok(());
    }

    if detailed {
        print_detailed_table(&workflows);
    } else {
        print_table(&workflows);
    }
    Ok(())
}

async fn apply_run_stats(store: &Store, info: &mut WorkflowInfo) -> Result<()> {
    let runs = store.list_runs(&info.name, "", 1000, 0).await?;

    info.total_runs = Some(runs.len());
    info.success_count = Some(
        runs.iter()
            .filter(|r| r.status == RunStatus::Success)
            .count(),
    );
    info.failed_count = Some(
        runs.iter()
            .filter(|r| r.status == RunStatus::Failed)
            .count(),
    );
    info.last_run = runs
        .first()
        .map(|r| r.created_at.format("%Y-%m-%d %H:%M:%S").to_string());

    Ok(())
}

fn print_table(workflows: &[WorkflowInfo]) {
    println!("{:<24}  {:>5}  {}", "WORKFLOW", "TASKS", "STATUS");
    println!("{:<24}  {:>5}  {}", "--------", "-----", "------");
    for wf in workflows {
        let status = if wf.valid { "✓ valid" } else { "✗ invalid" };
        println!("{:<24}  {:>5}  {}", wf.name, wf.tasks, status);
    }
}

fn print_detailed_table(workflows: &[WorkflowInfo]) {
    println!(
        "{:<24}  {:>5}  {:>10}  {:>7}  {:>6}  {}",
        "WORKFLOW", "TASKS", "TOTAL RUNS", "SUCCESS", "FAILED", "LAST RUN"
    );
    println!(
        "{:<24}  {:>5}  {:>10}  {:>7}  {:>6}  {}",
        "--------", "-----", "----------", "-------", "------", "--------"
    );
    for wf in workflows {
        println!(
            "{:<24}  {:>5}  {:>10}  {:>7}  {:>6}  {}",
            wf.name,
            wf.tasks,
            wf.total_runs.unwrap_or(0),
            wf.success_count.unwrap_or(0),
            wf.failed_count.unwrap_or(0),
            wf.last_run.as_deref().unwrap_or("-"),
        );
    }
}
