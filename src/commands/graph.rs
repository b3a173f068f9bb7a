// src/commands/graph.rs

use anyhow::Result;
use serde::Serialize;
use tracing::info;

use crate::cli::GraphFormat;
use crate::config::Config;
use crate::dag::{loader, render, Graph};

/// `wf graph <workflow> [--format ascii|dot|json]`
pub async fn execute(config: &Config, workflow: &str, format: GraphFormat) -> Result<()> {
    let graph = loader::load(&config.paths.workflows, workflow)?;

    info!(
        workflow,
        ?format,
        tasks = graph.len(),
        "rendering workflow graph"
    );

    match format {
        GraphFormat::Ascii => print!("{}", render::render_ascii(&graph)),
        GraphFormat::Dot => {
            print!("{}", render::render_dot(&graph));
            eprintln!("\nℹ Tip: Visualise with: dot -Tpng workflow.dot -o workflow.png");
        }
        GraphFormat::Json => print_json(&graph)?,
    }

    Ok(())
}

fn print_json(graph: &Graph) -> Result<()> {
    #[derive(Serialize)]
    struct TaskJson<'a> {
        name: &'a str,
        cmd: &'a str,
        retries: u32,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        depends_on: Vec<&'a str>,
    }

    #[derive(Serialize)]
    struct GraphJson<'a> {
        name: &'a str,
        tasks: Vec<TaskJson<'a>>,
    }

    let order = graph.topological_sort()?;
    let tasks = order
        .iter()
        .map(|task| TaskJson {
            name: &task.name,
            cmd: &task.cmd,
            retries: task.retries,
            depends_on: task.depends_on.iter().map(String::as_str).collect(),
        })
        .collect();

    println!(
        "{}",
        serde_json::to_string_pretty(&GraphJson {
            name: graph.name(),
            tasks,
        })?
    );
    Ok(())
}
