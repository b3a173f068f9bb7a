// src/config.rs

//! Application configuration: path roots and log level.
//!
//! Precedence, lowest to highest:
//! 1. built-in defaults under the platform data dir
//! 2. config file (`<config_dir>/wf/config.toml`, or `--config <path>`)
//! 3. environment variables with prefix `WF_` and `.` replaced by `_`
//!    (e.g. `WF_PATHS_WORKFLOWS`, `WF_LOG_LEVEL`)
//! 4. command-line flags (applied by the CLI layer)
//!
//! The loaded config is threaded explicitly into the loader, store and
//! executor; nothing reads it as a global.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level: error, warn, info, debug, trace.
    pub log_level: String,
    pub paths: Paths,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Paths {
    /// Directory holding `<name>.toml` workflow files.
    pub workflows: PathBuf,
    /// Root for per-run task log directories.
    pub logs: PathBuf,
    /// SQLite database file for run tracking.
    pub database: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            paths: Paths::default(),
        }
    }
}

impl Default for Paths {
    fn default() -> Self {
        let data = data_dir();
        Self {
            workflows: data.join("workflows"),
            logs: data.join("logs"),
            database: data.join("wf.db"),
        }
    }
}

fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("wf")
}

/// Default location of the config file.
pub fn config_file() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("wf")
        .join("config.toml")
}

impl Config {
    /// Load configuration from the default (or explicitly given) config
    /// file, then apply environment overrides.
    ///
    /// A missing config file is not an error; defaults apply.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let path = explicit_path
            .map(Path::to_path_buf)
            .unwrap_or_else(config_file);

        let mut config = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("reading config file at {path:?}"))?;
            toml::from_str(&contents)
                .with_context(|| format!("parsing TOML config from {path:?}"))?
        } else {
            Config::default()
        };

        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Some(v) = env_value("WF_LOG_LEVEL") {
            self.log_level = v;
        }
        if let Some(v) = env_value("WF_PATHS_WORKFLOWS") {
            self.paths.workflows = v.into();
        }
        if let Some(v) = env_value("WF_PATHS_LOGS") {
            self.paths.logs = v.into();
        }
        if let Some(v) = env_value("WF_PATHS_DATABASE") {
            self.paths.database = v.into();
        }
    }

    /// Default config file contents written by `wf init`.
    pub fn default_file_contents() -> String {
        let paths = Paths::default();
        format!(
            "# wf configuration file\n\
             # Controls global behaviour of the wf CLI. Every value can be\n\
             # overridden by WF_* environment variables or command-line flags.\n\
             \n\
             log_level = \"info\"\n\
             \n\
             [paths]\n\
             workflows = \"{}\"\n\
             logs = \"{}\"\n\
             database = \"{}\"\n",
            paths.workflows.display(),
            paths.logs.display(),
            paths.database.display(),
        )
    }
}

fn env_value(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let cfg = Config::load(Some(Path::new("/nonexistent/wf-config.toml"))).unwrap();
        assert_eq!(cfg.log_level, "info");
        assert!(cfg.paths.database.ends_with("wf.db"));
    }

    #[test]
    fn config_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "log_level = \"debug\"\n\n[paths]\nworkflows = \"/tmp/flows\"\n",
        )
        .unwrap();

        let cfg = Config::load(Some(&path)).unwrap();
        assert_eq!(cfg.log_level, "debug");
        assert_eq!(cfg.paths.workflows, PathBuf::from("/tmp/flows"));
        // Unspecified paths keep their defaults.
        assert!(cfg.paths.database.ends_with("wf.db"));
    }

    #[test]
    fn default_file_contents_parse_back() {
        let cfg: Config = toml::from_str(&Config::default_file_contents()).unwrap();
        assert_eq!(cfg.log_level, "info");
    }
}
