// src/store/sqlite.rs

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{Row, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::errors::{Result, WfError};
use crate::store::model::{RunStatus, TaskRun, TaskStatus, WorkflowRun};

/// SQLite-backed run store.
///
/// The pool is capped at a single connection: the store is owned by one
/// executor per process and writes must be durable in order, so there is
/// nothing to gain from concurrent connections.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open (creating if necessary) the database at `db_path` and ensure the
    /// schema exists.
    pub async fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&format!(
            "sqlite://{}",
            db_path.as_ref().to_string_lossy()
        ))
        .map_err(store_err("open"))?
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_secs(5))
        .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(store_err("connect"))?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS workflow_runs (
                id TEXT PRIMARY KEY,
                workflow TEXT NOT NULL,
                workflow_hash TEXT NOT NULL,
                status TEXT NOT NULL,
                started_at INTEGER NOT NULL,
                ended_at INTEGER,
                exit_code INTEGER,
                meta TEXT,
                created_at INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(store_err("migrate"))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS task_runs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                run_id TEXT NOT NULL,
                name TEXT NOT NULL,
                status TEXT NOT NULL,
                started_at INTEGER NOT NULL,
                ended_at INTEGER,
                attempts INTEGER NOT NULL DEFAULT 0,
                exit_code INTEGER,
                log_path TEXT,
                last_error TEXT,
                FOREIGN KEY (run_id) REFERENCES workflow_runs(id)
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(store_err("migrate"))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_task_runs_run_id ON task_runs(run_id)")
            .execute(&self.pool)
            .await
            .map_err(store_err("migrate"))?;

        Ok(())
    }

    /// Create and persist a new run with a fresh random id and
    /// `status = running`.
    ///
    /// The primary key constraint is the ultimate guarantor of id
    /// uniqueness; a colliding id surfaces as a store error rather than an
    /// overwrite.
    pub async fn new_workflow_run(&self, workflow: &str, graph_hash: &str) -> Result<WorkflowRun> {
        let now = Utc::now();
        let run = WorkflowRun {
            id: Uuid::new_v4().to_string(),
            workflow: workflow.to_string(),
            workflow_hash: graph_hash.to_string(),
            status: RunStatus::Running,
            started_at: now,
            ended_at: None,
            exit_code: None,
            meta: None,
            created_at: now,
        };

        sqlx::query(
            "INSERT INTO workflow_runs (id, workflow, workflow_hash, status, started_at, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&run.id)
        .bind(&run.workflow)
        .bind(&run.workflow_hash)
        .bind(run.status.as_str())
        .bind(run.started_at.timestamp_millis())
        .bind(run.created_at.timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(store_err("new_workflow_run"))?;

        debug!(run_id = %run.id, workflow, "created workflow run");
        Ok(run)
    }

    /// Overwrite the mutable fields of an existing run row.
    pub async fn update_workflow_run(&self, run: &WorkflowRun) -> Result<()> {
        sqlx::query(
            "UPDATE workflow_runs
             SET status = ?, ended_at = ?, exit_code = ?, meta = ?
             WHERE id = ?",
        )
        .bind(run.status.as_str())
        .bind(run.ended_at.map(|t| t.timestamp_millis()))
        .bind(run.exit_code)
        .bind(run.meta.as_ref().map(|m| m.to_string()))
        .bind(&run.id)
        .execute(&self.pool)
        .await
        .map_err(store_err("update_workflow_run"))?;

        Ok(())
    }

    /// Load a run by id; fails with [`WfError::RunNotFound`] if absent.
    pub async fn load_workflow_run(&self, id: &str) -> Result<WorkflowRun> {
        sqlx::query(
            "SELECT id, workflow, workflow_hash, status, started_at, ended_at, exit_code, meta, created_at
             FROM workflow_runs
             WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err("load_workflow_run"))?
        .map(|row| row_to_run(&row))
        .transpose()
        .map_err(store_err("load_workflow_run"))?
        .ok_or_else(|| WfError::RunNotFound(id.to_string()))
    }

    /// List runs, newest first, with optional filtering and pagination.
    ///
    /// An empty `workflow` or `status` string means "no filter" for that
    /// field.
    pub async fn list_runs(
        &self,
        workflow: &str,
        status: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<WorkflowRun>> {
        let rows = sqlx::query(
            "SELECT id, workflow, workflow_hash, status, started_at, ended_at, exit_code, meta, created_at
             FROM workflow_runs
             WHERE (? = '' OR workflow = ?)
               AND (? = '' OR status = ?)
             ORDER BY created_at DESC
             LIMIT ? OFFSET ?",
        )
        .bind(workflow)
        .bind(workflow)
        .bind(status)
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err("list_runs"))?;

        rows.iter()
            .map(row_to_run)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(store_err("list_runs"))
    }

    /// Insert a new task-attempt row; the generated surrogate id is written
    /// back into `task`.
    pub async fn save_task_run(&self, task: &mut TaskRun) -> Result<()> {
        let result = sqlx::query(
            "INSERT INTO task_runs (run_id, name, status, started_at, ended_at, attempts, exit_code, log_path, last_error)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&task.run_id)
        .bind(&task.name)
        .bind(task.status.as_str())
        .bind(task.started_at.timestamp_millis())
        .bind(task.ended_at.map(|t| t.timestamp_millis()))
        .bind(i64::from(task.attempts))
        .bind(task.exit_code)
        .bind(&task.log_path)
        .bind(&task.last_error)
        .execute(&self.pool)
        .await
        .map_err(store_err("save_task_run"))?;

        task.id = result.last_insert_rowid();
        Ok(())
    }

    /// Overwrite the mutable fields of a task-attempt row by surrogate id.
    pub async fn update_task_run(&self, task: &TaskRun) -> Result<()> {
        sqlx::query(
            "UPDATE task_runs
             SET status = ?, ended_at = ?, attempts = ?, exit_code = ?, log_path = ?, last_error = ?
             WHERE id = ?",
        )
        .bind(task.status.as_str())
        .bind(task.ended_at.map(|t| t.timestamp_millis()))
        .bind(i64::from(task.attempts))
        .bind(task.exit_code)
        .bind(&task.log_path)
        .bind(&task.last_error)
        .bind(task.id)
        .execute(&self.pool)
        .await
        .map_err(store_err("update_task_run"))?;

        Ok(())
    }

    /// All task-attempt rows for a run, in insertion order.
    pub async fn load_task_runs(&self, run_id: &str) -> Result<Vec<TaskRun>> {
        let rows = sqlx::query(
            "SELECT id, run_id, name, status, started_at, ended_at, attempts, exit_code, log_path, last_error
             FROM task_runs
             WHERE run_id = ?
             ORDER BY id ASC",
        )
        .bind(run_id)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err("load_task_runs"))?;

        rows.iter()
            .map(row_to_task_run)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(store_err("load_task_runs"))
    }

    /// The single attempt row for `(run_id, name)`, if any.
    pub async fn get_task_run(&self, run_id: &str, name: &str) -> Result<Option<TaskRun>> {
        sqlx::query(
            "SELECT id, run_id, name, status, started_at, ended_at, attempts, exit_code, log_path, last_error
             FROM task_runs
             WHERE run_id = ? AND name = ?",
        )
        .bind(run_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err("get_task_run"))?
        .map(|row| row_to_task_run(&row))
        .transpose()
        .map_err(store_err("get_task_run"))
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn store_err(op: &'static str) -> impl FnOnce(sqlx::Error) -> WfError {
    move |source| WfError::Store { op, source }
}

fn row_to_run(row: &SqliteRow) -> std::result::Result<WorkflowRun, sqlx::Error> {
    let status_str: String = row.try_get("status")?;
    let status = RunStatus::parse(&status_str).map_err(|e| sqlx::Error::Decode(e.into()))?;

    let meta: Option<String> = row.try_get("meta")?;
    let meta = meta.and_then(|s| serde_json::from_str(&s).ok());

    Ok(WorkflowRun {
        id: row.try_get("id")?,
        workflow: row.try_get("workflow")?,
        workflow_hash: row.try_get("workflow_hash")?,
        status,
        started_at: millis_to_datetime(row.try_get("started_at")?),
        ended_at: row
            .try_get::<Option<i64>, _>("ended_at")?
            .and_then(DateTime::from_timestamp_millis),
        exit_code: row.try_get("exit_code")?,
        meta,
        created_at: millis_to_datetime(row.try_get("created_at")?),
    })
}

fn row_to_task_run(row: &SqliteRow) -> std::result::Result<TaskRun, sqlx::Error> {
    let status_str: String = row.try_get("status")?;
    let status = TaskStatus::parse(&status_str).map_err(|e| sqlx::Error::Decode(e.into()))?;

    let attempts: i64 = row.try_get("attempts")?;

    Ok(TaskRun {
        id: row.try_get("id")?,
        run_id: row.try_get("run_id")?,
        name: row.try_get("name")?,
        status,
        started_at: millis_to_datetime(row.try_get("started_at")?),
        ended_at: row
            .try_get::<Option<i64>, _>("ended_at")?
            .and_then(DateTime::from_timestamp_millis),
        attempts: attempts as u32,
        exit_code: row.try_get("exit_code")?,
        log_path: row
            .try_get::<Option<String>, _>("log_path")?
            .unwrap_or_default(),
        last_error: row
            .try_get::<Option<String>, _>("last_error")?
            .unwrap_or_default(),
    })
}

fn millis_to_datetime(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_else(Utc::now)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn open_memory_store() -> Store {
        Store::open(":memory:").await.unwrap()
    }

    fn new_task_run(run_id: &str, name: &str) -> TaskRun {
        TaskRun {
            id: 0,
            run_id: run_id.to_string(),
            name: name.to_string(),
            status: TaskStatus::Running,
            started_at: Utc::now(),
            ended_at: None,
            attempts: 0,
            exit_code: None,
            log_path: String::new(),
            last_error: String::new(),
        }
    }

    #[tokio::test]
    async fn run_round_trip_preserves_all_fields() {
        let store = open_memory_store().await;

        let run = store.new_workflow_run("demo", "abc123").await.unwrap();
        let loaded = store.load_workflow_run(&run.id).await.unwrap();

        assert_eq!(loaded.id, run.id);
        assert_eq!(loaded.workflow, "demo");
        assert_eq!(loaded.workflow_hash, "abc123");
        assert_eq!(loaded.status, RunStatus::Running);
        assert_eq!(
            loaded.started_at.timestamp_millis(),
            run.started_at.timestamp_millis()
        );
        assert_eq!(loaded.ended_at, None);
        assert_eq!(loaded.exit_code, None);
        assert_eq!(loaded.meta, None);
    }

    #[tokio::test]
    async fn run_update_round_trips_optional_fields() {
        let store = open_memory_store().await;

        let mut run = store.new_workflow_run("demo", "abc123").await.unwrap();
        run.status = RunStatus::Failed;
        run.ended_at = Some(Utc::now());
        run.exit_code = Some(1);
        run.meta = Some(serde_json::json!({"reason": "task failed"}));
        store.update_workflow_run(&run).await.unwrap();

        let loaded = store.load_workflow_run(&run.id).await.unwrap();
        assert_eq!(loaded.status, RunStatus::Failed);
        assert_eq!(
            loaded.ended_at.map(|t| t.timestamp_millis()),
            run.ended_at.map(|t| t.timestamp_millis())
        );
        assert_eq!(loaded.exit_code, Some(1));
        assert_eq!(loaded.meta, run.meta);
    }

    #[tokio::test]
    async fn load_unknown_run_is_not_found() {
        let store = open_memory_store().await;

        match store.load_workflow_run("no-such-run").await {
            Err(WfError::RunNotFound(id)) => assert_eq!(id, "no-such-run"),
            other => panic!("expected RunNotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn save_task_run_assigns_surrogate_id() {
        let store = open_memory_store().await;
        let run = store.new_workflow_run("demo", "h").await.unwrap();

        let mut first = new_task_run(&run.id, "a");
        let mut second = new_task_run(&run.id, "b");
        store.save_task_run(&mut first).await.unwrap();
        store.save_task_run(&mut second).await.unwrap();

        assert!(first.id > 0);
        assert!(second.id > first.id);
    }

    #[tokio::test]
    async fn task_run_update_and_get_round_trip() {
        let store = open_memory_store().await;
        let run = store.new_workflow_run("demo", "h").await.unwrap();

        let mut task = new_task_run(&run.id, "a");
        store.save_task_run(&mut task).await.unwrap();

        task.status = TaskStatus::Success;
        task.attempts = 2;
        task.exit_code = Some(0);
        task.ended_at = Some(Utc::now());
        task.log_path = "/tmp/logs/a_2.log".to_string();
        task.last_error = String::new();
        store.update_task_run(&task).await.unwrap();

        let loaded = store.get_task_run(&run.id, "a").await.unwrap().unwrap();
        assert_eq!(loaded.id, task.id);
        assert_eq!(loaded.status, TaskStatus::Success);
        assert_eq!(loaded.attempts, 2);
        assert_eq!(loaded.exit_code, Some(0));
        assert_eq!(loaded.log_path, "/tmp/logs/a_2.log");

        assert!(store
            .get_task_run(&run.id, "missing")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn load_task_runs_preserves_insertion_order() {
        let store = open_memory_store().await;
        let run = store.new_workflow_run("demo", "h").await.unwrap();

        for name in ["c", "a", "b"] {
            let mut task = new_task_run(&run.id, name);
            store.save_task_run(&mut task).await.unwrap();
        }

        let names: Vec<String> = store
            .load_task_runs(&run.id)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, ["c", "a", "b"]);
    }

    #[tokio::test]
    async fn list_runs_filters_and_paginates() {
        let store = open_memory_store().await;

        let mut failed = store.new_workflow_run("alpha", "h1").await.unwrap();
        failed.status = RunStatus::Failed;
        store.update_workflow_run(&failed).await.unwrap();

        tokio::time::sleep(Duration::from_millis(5)).await;
        store.new_workflow_run("alpha", "h1").await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        store.new_workflow_run("beta", "h2").await.unwrap();

        // No filters: newest first.
        let all = store.list_runs("", "", 10, 0).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].workflow, "beta");

        // Workflow filter.
        let alpha = store.list_runs("alpha", "", 10, 0).await.unwrap();
        assert_eq!(alpha.len(), 2);

        // Status filter.
        let failed_runs = store.list_runs("", "failed", 10, 0).await.unwrap();
        assert_eq!(failed_runs.len(), 1);
        assert_eq!(failed_runs[0].id, failed.id);

        // Pagination.
        let page = store.list_runs("", "", 1, 1).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].workflow, "alpha");
    }
}
