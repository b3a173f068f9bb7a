// src/commands/run.rs

use anyhow::Result;
use tracing::info;

use crate::commands::{cancel_on_ctrl_c, open_store};
use crate::config::Config;
use crate::dag::{loader, Graph};
use crate::exec::{ExecPaths, Executor};
use crate::store::{TaskPlan, WorkflowPlan};

/// `wf run <workflow> [--dry-run] [--json]`
pub async fn execute(config: &Config, workflow: &str, dry_run: bool, json: bool) -> Result<()> {
    let graph = loader::load(&config.paths.workflows, workflow)?;

    if dry_run {
        let plan = plan_run(&graph)?;
        if json {
            println!("{}", serde_json::to_string_pretty(&plan)?);
        } else {
            print_plan(&plan);
            println!("\nNo tasks were executed.");
        }
        return Ok(());
    }

    let store = open_store(config).await?;
    let token = cancel_on_ctrl_c();

    let executor = Executor::new(
        store,
        ExecPaths {
            workflows_dir: config.paths.workflows.clone(),
            logs_dir: config.paths.logs.clone(),
        },
    );

    println!("Running workflow: {}", graph.name());
    let run = executor.run(&graph, &token).await?;
    println!("✓ Workflow '{}' completed (run {})", run.workflow, run.id);

    info!(workflow = %run.workflow, run_id = %run.id, "run command finished");
    Ok(())
}

/// Build the dry-run execution plan in topological order.
pub(crate) fn plan_run(graph: &Graph) -> Result<WorkflowPlan> {
    let order = graph.topological_sort()?;

    Ok(WorkflowPlan {
        workflow: graph.name().to_string(),
        tasks: order
            .iter()
            .enumerate()
            .map(|(i, task)| TaskPlan {
                order: i + 1,
                name: task.name.clone(),
                cmd: task.cmd.clone(),
                depends_on: task.depends_on.clone(),
                retries: task.retries,
            })
            .collect(),
    })
}

fn print_plan(plan: &WorkflowPlan) {
    print!("========== DRY RUN MODE ==========\n\n");
    println!("Execution Plan for Workflow: {}", plan.workflow);
    println!("--------------------------------------------------");
    for task in &plan.tasks {
        println!("Task {}: {}", task.order, task.name);
        println!("  Command: {}", task.cmd);
        if !task.depends_on.is_empty() {
            println!("  Depends On: {:?}", task.depends_on);
        }
        println!("  Retries: {}", task.retries);
        println!("--------------------------------------------------");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::Task;

    #[test]
    fn plan_lists_tasks_in_execution_order() {
        let mut graph = Graph::new("plan-test");
        for (name, deps) in [("b", vec!["a"]), ("a", vec![])] {
            graph
                .add_task(Task {
                    name: name.to_string(),
                    cmd: format!("echo {name}"),
                    depends_on: deps.into_iter().map(String::from).collect(),
                    retries: 0,
                })
                .unwrap();
        }

        let plan = plan_run(&graph).unwrap();
        assert_eq!(plan.workflow, "plan-test");
        assert_eq!(plan.tasks.len(), 2);
        assert_eq!(plan.tasks[0].order, 1);
        assert_eq!(plan.tasks[0].name, "a");
        assert_eq!(plan.tasks[1].name, "b");
        assert_eq!(plan.tasks[1].depends_on, ["a"]);
    }
}
