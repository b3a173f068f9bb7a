// src/dag/loader.rs

//! Decode TOML workflow documents into a validated [`Graph`].
//!
//! Parsing is pure: [`from_str`] works on an in-memory document and never
//! touches the filesystem. Resolving a workflow *name* to a file under the
//! configured workflows directory is done by [`load`], so callers that
//! already hold the document text can skip the filesystem entirely.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info};

use crate::dag::{Graph, Task};
use crate::errors::{Result, WfError};

/// Raw TOML shape of a workflow document.
///
/// ```toml
/// name = "deploy"
///
/// [tasks.build]
/// cmd = "cargo build --release"
///
/// [tasks.upload]
/// cmd = "scp target/release/app host:"
/// depends_on = ["build"]
/// retries = 2
/// ```
///
/// Unknown fields are tolerated. The map key is the authoritative task name.
#[derive(Debug, Deserialize)]
struct RawWorkflow {
    #[serde(default)]
    name: String,
    #[serde(default)]
    tasks: BTreeMap<String, RawTask>,
}

#[derive(Debug, Deserialize)]
struct RawTask {
    #[serde(default)]
    cmd: String,
    #[serde(default)]
    retries: u32,
    #[serde(default)]
    depends_on: Vec<String>,
}

/// Parse a workflow document and validate the resulting graph.
pub fn from_str(data: &str) -> Result<Graph> {
    let raw: RawWorkflow = toml::from_str(data)?;

    let mut graph = Graph::new(raw.name);
    for (name, spec) in raw.tasks {
        graph.add_task(Task {
            name: name.clone(),
            cmd: spec.cmd,
            depends_on: spec.depends_on,
            retries: spec.retries,
        })?;
    }

    graph.validate()?;
    debug!(workflow = %graph.name(), tasks = graph.len(), "workflow parsed");
    Ok(graph)
}

/// Load `<workflows_dir>/<name>.toml` and parse it.
///
/// A trailing `.toml` in `name` is tolerated, so both `wf run deploy` and
/// `wf run deploy.toml` resolve to the same file.
pub fn load(workflows_dir: &Path, name: &str) -> Result<Graph> {
    let stem = name.strip_suffix(".toml").unwrap_or(name);
    let path = workflows_dir.join(format!("{stem}.toml"));

    let data = fs::read_to_string(&path).map_err(|source| WfError::WorkflowNotFound {
        path: path.clone(),
        source,
    })?;

    let graph = from_str(&data)?;
    info!(workflow = %graph.name(), tasks = graph.len(), path = ?path, "workflow loaded");
    Ok(graph)
}

/// Names of all workflow files (`*.toml`) in a directory, sorted ascending.
pub fn workflow_names(workflows_dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(workflows_dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            continue;
        }
        if let (Some(stem), Some(ext)) = (path.file_stem(), path.extension()) {
            if ext == "toml" {
                names.push(stem.to_string_lossy().into_owned());
            }
        }
    }
    names.sort_unstable();
    Ok(names)
}
