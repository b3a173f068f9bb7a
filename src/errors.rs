// src/errors.rs

//! Crate-wide error types.

use std::path::PathBuf;

use thiserror::Error;

use crate::store::RunStatus;

/// Structural problems in a workflow graph.
///
/// All of these are detected before any process is spawned or any row is
/// written.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("workflow name is required")]
    EmptyWorkflowName,

    #[error("no tasks defined")]
    NoTasks,

    #[error("duplicate task name: {0}")]
    DuplicateTask(String),

    #[error("invalid task name {0:?} (allowed: letters, digits, _, -)")]
    InvalidTaskName(String),

    #[error("task {0} has no command defined")]
    MissingCommand(String),

    #[error("task {task} depends on missing task {dependency}")]
    MissingDependency { task: String, dependency: String },

    #[error("cycle detected in task graph")]
    Cycle,
}

#[derive(Debug, Error)]
pub enum WfError {
    #[error("workflow file not found at {path:?}")]
    WorkflowNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse workflow document")]
    Decode(#[from] toml::de::Error),

    #[error("workflow validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("store operation '{op}' failed")]
    Store {
        op: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("failed to spawn process for task '{task}'")]
    Spawn {
        task: String,
        #[source]
        source: std::io::Error,
    },

    #[error("task {task} failed => workflow {workflow} failed: {reason}")]
    TaskFailed {
        task: String,
        workflow: String,
        reason: String,
    },

    #[error("workflow cancelled")]
    Cancelled,

    #[error("run '{0}' not found")]
    RunNotFound(String),

    #[error("run '{id}' is not resumable (current status: {status})")]
    NotResumable { id: String, status: RunStatus },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, WfError>;
