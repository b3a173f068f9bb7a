// src/exec/executor.rs

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use chrono::Utc;
use tokio::io::AsyncReadExt;
use tokio::process::Child;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::dag::{loader, Graph, Task};
use crate::errors::{Result, WfError};
use crate::exec::proc;
use crate::store::{RunStatus, Store, TaskRun, TaskStatus, WorkflowRun};

/// Path roots the executor needs, threaded in explicitly rather than read
/// from ambient globals.
#[derive(Debug, Clone)]
pub struct ExecPaths {
    /// Directory holding `<name>.toml` workflow files; used when resuming.
    pub workflows_dir: PathBuf,
    /// Root for per-run log directories (`<logs_dir>/<run_id>/`).
    pub logs_dir: PathBuf,
}

/// Drives a workflow graph to completion, one task at a time.
///
/// Tasks execute sequentially in the graph's deterministic topological
/// order. The only concurrency is the cancellation listener and the spawned
/// child itself; the executor never returns while a child it spawned is
/// still alive.
pub struct Executor {
    store: Store,
    paths: ExecPaths,
    /// Optional per-task wall-clock limit; `None` means no limit.
    task_timeout: Option<Duration>,
}

enum AttemptKind {
    Success,
    Failed { exit_code: i64, error: String },
    Cancelled,
}

struct AttemptOutcome {
    output: Vec<u8>,
    kind: AttemptKind,
}

impl Executor {
    pub fn new(store: Store, paths: ExecPaths) -> Self {
        Self {
            store,
            paths,
            task_timeout: None,
        }
    }

    pub fn with_task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout = Some(timeout);
        self
    }

    /// Execute `graph` from scratch.
    ///
    /// Records a fresh run row (with the graph's content hash) before the
    /// first task starts, then drives the task loop. Returns the final run
    /// row on success.
    pub async fn run(&self, graph: &Graph, token: &CancellationToken) -> Result<WorkflowRun> {
        info!(workflow = %graph.name(), "running workflow");

        let order = graph.topological_sort()?;
        let hash = graph.compute_hash();
        let mut run = self.store.new_workflow_run(graph.name(), &hash).await?;

        self.drive(graph.name(), &order, &mut run, token).await?;
        Ok(run)
    }

    /// Resume a previously failed run.
    ///
    /// Reloads the workflow by name from the workflows directory, recomputes
    /// the order and re-enters the task loop, which skips every task whose
    /// attempt row is already at `success`. The recorded graph hash is not
    /// verified against the reloaded workflow.
    pub async fn resume(
        &self,
        mut run: WorkflowRun,
        token: &CancellationToken,
    ) -> Result<WorkflowRun> {
        if run.status != RunStatus::Failed {
            return Err(WfError::NotResumable {
                id: run.id,
                status: run.status,
            });
        }

        info!(workflow = %run.workflow, run_id = %run.id, "resuming workflow");

        let graph = loader::load(&self.paths.workflows_dir, &run.workflow)?;
        let order = graph.topological_sort()?;

        run.status = RunStatus::Running;
        run.ended_at = None;
        self.store.update_workflow_run(&run).await?;

        self.drive(graph.name(), &order, &mut run, token).await?;
        Ok(run)
    }

    /// The shared task-drive loop for `run` and `resume`.
    async fn drive(
        &self,
        workflow: &str,
        order: &[&Task],
        run: &mut WorkflowRun,
        token: &CancellationToken,
    ) -> Result<()> {
        for task in order {
            if token.is_cancelled() {
                warn!(workflow, run_id = %run.id, "workflow cancelled before task start");
                self.fail_run(run).await?;
                return Err(WfError::Cancelled);
            }

            let existing = self.store.get_task_run(&run.id, &task.name).await?;
            if let Some(prior) = &existing {
                if prior.status == TaskStatus::Success {
                    info!(task = %task.name, "skipping completed task");
                    continue;
                }
            }

            let mut record = match existing {
                Some(record) => record,
                None => {
                    let mut record = TaskRun {
                        id: 0,
                        run_id: run.id.clone(),
                        name: task.name.clone(),
                        status: TaskStatus::Running,
                        started_at: Utc::now(),
                        ended_at: None,
                        attempts: 0,
                        exit_code: None,
                        log_path: String::new(),
                        last_error: String::new(),
                    };
                    self.store.save_task_run(&mut record).await?;
                    record
                }
            };

            self.run_task(workflow, task, run, &mut record, token)
                .await?;
        }

        run.status = RunStatus::Success;
        run.ended_at = Some(Utc::now());
        self.store.update_workflow_run(run).await?;

        info!(workflow, run_id = %run.id, "workflow completed");
        Ok(())
    }

    /// Run a single task to success or retry exhaustion.
    async fn run_task(
        &self,
        workflow: &str,
        task: &Task,
        run: &mut WorkflowRun,
        record: &mut TaskRun,
        token: &CancellationToken,
    ) -> Result<()> {
        info!(task = %task.name, cmd = %task.cmd, "running task");

        let max_attempts = task.retries + 1;
        let mut attempt = 0;

        loop {
            attempt += 1;
            record.attempts = attempt;

            let log_dir = self.paths.logs_dir.join(&run.id);
            tokio::fs::create_dir_all(&log_dir).await?;
            let log_path = log_dir.join(format!("{}_{}.log", task.name, attempt));

            let outcome = self.run_attempt(task, token).await;

            tokio::fs::write(&log_path, &outcome.output).await?;
            record.log_path = log_path.display().to_string();

            match outcome.kind {
                AttemptKind::Success => {
                    record.status = TaskStatus::Success;
                    record.ended_at = Some(Utc::now());
                    record.exit_code = Some(0);
                    self.store.update_task_run(record).await?;

                    info!(task = %task.name, attempt, "task completed");
                    return Ok(());
                }
                AttemptKind::Cancelled => {
                    record.status = TaskStatus::Failed;
                    record.ended_at = Some(Utc::now());
                    record.last_error = WfError::Cancelled.to_string();
                    self.store.update_task_run(record).await?;
                    self.fail_run(run).await?;

                    warn!(task = %task.name, attempt, "task cancelled");
                    return Err(WfError::Cancelled);
                }
                AttemptKind::Failed { exit_code, error } => {
                    record.exit_code = Some(exit_code);
                    record.last_error = error.clone();
                    self.store.update_task_run(record).await?;

                    if attempt >= max_attempts {
                        record.status = TaskStatus::Failed;
                        record.ended_at = Some(Utc::now());
                        self.store.update_task_run(record).await?;
                        self.fail_run(run).await?;

                        error!(
                            task = %task.name,
                            workflow,
                            exit_code,
                            "task failed => workflow failed"
                        );
                        return Err(WfError::TaskFailed {
                            task: task.name.clone(),
                            workflow: workflow.to_string(),
                            reason: error,
                        });
                    }

                    debug!(task = %task.name, attempt, "retrying task");
                }
            }
        }
    }

    /// Spawn the task command once and classify the result.
    ///
    /// The child's combined stdout+stderr is always returned so the caller
    /// can write the attempt log, including partial output from cancelled or
    /// timed-out attempts.
    async fn run_attempt(&self, task: &Task, token: &CancellationToken) -> AttemptOutcome {
        let mut cmd = proc::shell_command(&task.cmd);
        cmd.stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        proc::detach_process_group(&mut cmd);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(source) => {
                let err = WfError::Spawn {
                    task: task.name.clone(),
                    source,
                };
                return AttemptOutcome {
                    output: Vec::new(),
                    kind: AttemptKind::Failed {
                        exit_code: 1,
                        error: err.to_string(),
                    },
                };
            }
        };

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let stdout_reader = tokio::spawn(read_to_end(stdout));
        let stderr_reader = tokio::spawn(read_to_end(stderr));

        let kind = if let Some(timeout) = self.task_timeout {
            tokio::select! {
                status = child.wait() => classify_exit(status),
                _ = tokio::time::sleep(timeout) => {
                    kill_child(&mut child, &task.name).await;
                    AttemptKind::Failed {
                        exit_code: 1,
                        error: format!("task timed out after {timeout:?}"),
                    }
                }
                _ = token.cancelled() => {
                    kill_child(&mut child, &task.name).await;
                    AttemptKind::Cancelled
                }
            }
        } else {
            tokio::select! {
                status = child.wait() => classify_exit(status),
                _ = token.cancelled() => {
                    kill_child(&mut child, &task.name).await;
                    AttemptKind::Cancelled
                }
            }
        };

        // Killing the child closed its pipes, so both readers terminate.
        let mut output = stdout_reader.await.unwrap_or_default();
        output.extend(stderr_reader.await.unwrap_or_default());

        AttemptOutcome { output, kind }
    }

    async fn fail_run(&self, run: &mut WorkflowRun) -> Result<()> {
        run.status = RunStatus::Failed;
        run.ended_at = Some(Utc::now());
        self.store.update_workflow_run(run).await
    }
}

fn classify_exit(status: std::io::Result<std::process::ExitStatus>) -> AttemptKind {
    match status {
        Ok(status) if status.success() => AttemptKind::Success,
        Ok(status) => AttemptKind::Failed {
            exit_code: i64::from(status.code().unwrap_or(-1)),
            error: format!("command failed: {status}"),
        },
        Err(err) => AttemptKind::Failed {
            exit_code: 1,
            error: format!("failed to wait for process: {err}"),
        },
    }
}

/// Terminate a child and reap it so no spawned process outlives the
/// executor.
async fn kill_child(child: &mut Child, task: &str) {
    if let Err(err) = child.start_kill() {
        warn!(task, error = %err, "failed to kill child process");
    }
    if let Err(err) = child.wait().await {
        warn!(task, error = %err, "failed to reap killed child process");
    }
}

async fn read_to_end<R>(reader: Option<R>) -> Vec<u8>
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    if let Some(mut reader) = reader {
        let _ = reader.read_to_end(&mut buf).await;
    }
    buf
}
