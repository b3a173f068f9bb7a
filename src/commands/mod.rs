// src/commands/mod.rs

//! CLI subcommand implementations.
//!
//! Each module wires configuration, store, loader and executor together for
//! one subcommand and handles user-facing output. Core errors bubble up to
//! `main`, which prints them and exits non-zero.

pub mod graph;
pub mod init;
pub mod list;
pub mod logs;
pub mod resume;
pub mod run;
pub mod runs;
pub mod validate;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::store::Store;

pub(crate) async fn open_store(config: &Config) -> Result<Store> {
    Store::open(&config.paths.database)
        .await
        .context("initialising run store")
}

/// A cancellation token wired to Ctrl-C.
pub(crate) fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let handle = token.clone();
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            eprintln!("failed to listen for Ctrl+C: {err}");
            return;
        }
        eprintln!("\n✖ Received interrupt. Cancelling workflow...");
        handle.cancel();
    });
    token
}
