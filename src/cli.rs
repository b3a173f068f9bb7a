// src/cli.rs

//! CLI argument parsing using `clap` (derive).

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for `wf`.
#[derive(Debug, Parser)]
#[command(
    name = "wf",
    version,
    about = "wf - lightweight local workflow runner",
    long_about = "wf is a minimal, deterministic workflow orchestrator.\n\n\
                  Workflows are defined in TOML format and executed as a DAG\n\
                  in topological order, with retries, resumable runs and\n\
                  per-attempt logs."
)]
pub struct Cli {
    /// Path to the config file (overrides the default location).
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `WF_LOG` or the config file decide.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a workflow.
    Run {
        /// Name of the workflow (file `<name>.toml` in the workflows dir).
        workflow: String,

        /// Print the execution plan without running any task.
        #[arg(long)]
        dry_run: bool,

        /// Output in JSON format.
        #[arg(long)]
        json: bool,
    },

    /// Resume a failed workflow run from the point of failure.
    Resume {
        /// Id of the failed run.
        run_id: String,
    },

    /// List available workflows.
    List {
        /// Output in JSON format.
        #[arg(long)]
        json: bool,

        /// Show run statistics per workflow.
        #[arg(short, long)]
        detailed: bool,
    },

    /// List workflow runs.
    Runs {
        /// Filter by workflow name.
        #[arg(short, long, default_value = "")]
        workflow: String,

        /// Filter by status (pending|running|success|failed).
        #[arg(short, long, default_value = "")]
        status: String,

        /// Limit number of results.
        #[arg(short, long, default_value_t = 10)]
        limit: i64,

        /// Offset for pagination.
        #[arg(short, long, default_value_t = 0)]
        offset: i64,

        /// Output in JSON format.
        #[arg(long)]
        json: bool,
    },

    /// Show logs for a run or a specific task within it.
    Logs {
        /// Id of the run.
        run_id: String,

        /// Restrict output to this task.
        task: Option<String>,
    },

    /// Validate all workflows, or a specific one.
    Validate {
        /// Workflow to validate; all workflows when omitted.
        workflow: Option<String>,

        /// Output in JSON format.
        #[arg(long)]
        json: bool,
    },

    /// Display the workflow DAG structure.
    Graph {
        /// Name of the workflow.
        workflow: String,

        /// Output format.
        #[arg(short, long, value_enum, default_value = "ascii")]
        format: GraphFormat,
    },

    /// Initialise workflow directories, database and config file.
    Init,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Output format for `wf graph`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum GraphFormat {
    Ascii,
    Dot,
    Json,
}

/// Convenience wrapper around `Cli::parse()`.
pub fn parse() -> Cli {
    Cli::parse()
}
