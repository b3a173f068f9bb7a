// src/lib.rs

//! `wf`: a minimal, deterministic, local-first workflow orchestrator.
//!
//! Workflows are TOML documents describing a DAG of shell commands. The
//! engine validates the graph, executes tasks sequentially in a
//! deterministic topological order, retries failed tasks up to their retry
//! budget, records every state transition in a local SQLite database and
//! can resume a failed run from the exact point of failure.

pub mod cli;
pub mod commands;
pub mod config;
pub mod dag;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod store;

use anyhow::Result;
use tracing::debug;

use crate::cli::{Cli, Command, LogLevel};
use crate::config::Config;

/// High-level entry point used by `main.rs`.
///
/// Loads configuration, initialises logging, then dispatches to the
/// requested subcommand.
pub async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;

    let cli_level = if cli.verbose {
        Some(LogLevel::Debug)
    } else {
        cli.log_level
    };
    logging::init(cli_level, &config.log_level)?;

    debug!(?config, "configuration loaded");

    match cli.command {
        Command::Run {
            workflow,
            dry_run,
            json,
        } => commands::run::execute(&config, &workflow, dry_run, json).await,
        Command::Resume { run_id } => commands::resume::execute(&config, &run_id).await,
        Command::List { json, detailed } => commands::list::execute(&config, json, detailed).await,
        Command::Runs {
            workflow,
            status,
            limit,
            offset,
            json,
        } => commands::runs::execute(&config, &workflow, &status, limit, offset, json).await,
        Command::Logs { run_id, task } => {
            commands::logs::execute(&config, &run_id, task.as_deref()).await
        }
        Command::Validate { workflow, json } => {
            commands::validate::execute(&config, workflow.as_deref(), json).await
        }
        Command::Graph { workflow, format } => {
            commands::graph::execute(&config, &workflow, format).await
        }
        Command::Init => commands::init::execute(&config).await,
    }
}
