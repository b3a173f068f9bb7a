// src/commands/validate.rs

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::Config;
use crate::dag::loader;

#[derive(Debug, Serialize)]
struct ValidateResult {
    name: String,
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// `wf validate [workflow] [--json]`
pub async fn execute(config: &Config, workflow: Option<&str>, json: bool) -> Result<()> {
    match workflow {
        Some(name) => validate_single(config, name, json),
        None => validate_all(config, json),
    }
}

fn validate_single(config: &Config, name: &str, json: bool) -> Result<()> {
    let result = check_workflow(config, name);

    if json {
        println!("{}", serde_json::to_string_pretty(&[&result])?);
    } else if result.valid {
        println!("✓ {}: valid", result.name);
    } else {
        println!(
            "✗ {}: {}",
            result.name,
            result.error.as_deref().unwrap_or("invalid")
        );
    }

    if !result.valid {
        bail!("workflow '{}' failed validation", name);
    }
    Ok(())
}

fn validate_all(config: &Config, json: bool) -> Result<()> {
    let names = loader::workflow_names(&config.paths.workflows)
        .context("reading workflows directory")?;

    let results: Vec<ValidateResult> = names
        .iter()
        .map(|name| check_workflow(config, name))
        .collect();
    let failed = results.iter().filter(|r| !r.valid).count();

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        print_table(&results);
        println!("\n{}/{} workflows valid", results.len() - failed, results.len());
    }

    if failed > 0 {
        bail!("{failed} workflow(s) failed validation");
    }

    info!(count = results.len(), "all workflows validated successfully");
    Ok(())
}

fn check_workflow(config: &Config, name: &str) -> ValidateResult {
    match loader::load(&config.paths.workflows, name) {
        Ok(_) => ValidateResult {
            name: name.to_string(),
            valid: true,
            error: None,
        },
        Err(err) => {
            warn!(workflow = %name, error = %err, "workflow validation failed");
            ValidateResult {
                name: name.to_string(),
                valid: false,
                error: Some(err.to_string()),
            }
        }
    }
}

fn print_table(results: &[ValidateResult]) {
    println!("{:<24}  {:<10}  {}", "WORKFLOW", "STATUS", "ERROR");
    println!("{:<24}  {:<10}  {}", "--------", "------", "-----");
    for result in results {
        let (status, error) = if result.valid {
            ("✓ valid", "-".to_string())
        } else {
            (
                "✗ invalid",
                truncate(result.error.as_deref().unwrap_or(""), 50),
            )
        };
        println!("{:<24}  {:<10}  {}", result.name, status, error);
    }
}

fn truncate(msg: &str, max_len: usize) -> String {
    if msg.len() > max_len {
        format!("{}...", &msg[..max_len - 3])
    } else {
        msg.to_string()
    }
}
