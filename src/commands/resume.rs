// src/commands/resume.rs

use anyhow::Result;
use tracing::info;

use crate::commands::{cancel_on_ctrl_c, open_store};
use crate::config::Config;
use crate::exec::{ExecPaths, Executor};

/// `wf resume <run_id>`
pub async fn execute(config: &Config, run_id: &str) -> Result<()> {
    let store = open_store(config).await?;

    // The executor re-checks resumability; loading first gives the user a
    // clean "not found" before anything else happens.
    let run = store.load_workflow_run(run_id).await?;

    let token = cancel_on_ctrl_c();
    let executor = Executor::new(
        store,
        ExecPaths {
            workflows_dir: config.paths.workflows.clone(),
            logs_dir: config.paths.logs.clone(),
        },
    );

    println!("Resuming workflow run: {run_id}");
    let run = executor.resume(run, &token).await?;
    println!("✓ Workflow '{}' completed (run {})", run.workflow, run.id);

    info!(run_id = %run.id, "resume command finished");
    Ok(())
}
