// src/commands/init.rs

use std::fs;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::commands::open_store;
use crate::config::{self, Config};

/// `wf init`: create the workflow/log directories, initialise the SQLite
/// database and write a default config file if none exists yet.
pub async fn execute(config: &Config) -> Result<()> {
    for dir in [&config.paths.workflows, &config.paths.logs] {
        fs::create_dir_all(dir)
            .with_context(|| format!("creating directory {}", dir.display()))?;
        debug!(path = %dir.display(), "directory created or already exists");
    }

    if let Some(parent) = config.paths.database.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {}", parent.display()))?;
    }

    // Opening the store runs the schema migration.
    let store = open_store(config).await?;
    store.close().await;

    let config_path = config::config_file();
    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating config directory {}", parent.display()))?;
    }

    if config_path.exists() {
        info!(path = %config_path.display(), "config file already exists, skipping creation");
    } else {
        fs::write(&config_path, Config::default_file_contents())
            .with_context(|| format!("writing config file {}", config_path.display()))?;
        info!(path = %config_path.display(), "config file created");
    }

    println!("\n✓ Project initialised successfully");
    println!("  Config file: {}", config_path.display());
    println!("  Workflows:   {}", config.paths.workflows.display());
    println!("  Logs:        {}", config.paths.logs.display());
    println!("  Database:    {}", config.paths.database.display());
    println!("\nConfigure paths via environment variables or config file.");

    Ok(())
}
