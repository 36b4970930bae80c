//! Configuration management with YAML support

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub report: ReportConfig,

    #[serde(default)]
    pub display: DisplayConfig,
}

/// Checkpoint database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_path")]
    pub path: String,

    /// Checkpoint namespace to read (root graph is "")
    #[serde(default)]
    pub namespace: String,
}

/// Settings for the default report run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_output_path")]
    pub output: String,

    /// Thread inspected when present, otherwise the first listed thread wins
    #[serde(default = "default_preferred_thread")]
    pub preferred_thread: String,
}

/// Output formatting limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_content_limit")]
    pub content_limit: usize,

    #[serde(default = "default_sample_rows")]
    pub sample_rows: usize,
}

// Default value functions
fn default_database_path() -> String {
    "checkpoints.db".to_string()
}

fn default_output_path() -> String {
    "db_output_utf8.txt".to_string()
}

fn default_preferred_thread() -> String {
    "1".to_string()
}

fn default_content_limit() -> usize {
    100
}

fn default_sample_rows() -> usize {
    3
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            namespace: String::new(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output: default_output_path(),
            preferred_thread: default_preferred_thread(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            content_limit: default_content_limit(),
            sample_rows: default_sample_rows(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    /// Searches in order:
    /// 1. Provided path
    /// 2. ./checkpeek.yaml (current directory)
    /// 3. <user config dir>/checkpeek/checkpeek.yaml
    pub fn load(path: &str) -> Result<Self> {
        let mut search_paths = vec![
            PathBuf::from(shellexpand::tilde(path).to_string()),
            PathBuf::from("checkpeek.yaml"),
        ];
        if let Some(dir) = dirs::config_dir() {
            search_paths.push(dir.join("checkpeek").join("checkpeek.yaml"));
        }

        for search_path in &search_paths {
            if search_path.exists() {
                debug!(path = %search_path.display(), "loading config");
                return Self::from_file(search_path);
            }
        }

        // No config file found, use defaults
        Ok(Config::default())
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        Ok(config)
    }

    /// Get the database path, expanding ~ to home directory
    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.database.path).to_string())
    }

    /// Get the report output path, expanding ~ to home directory
    pub fn output_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.report.output).to_string())
    }
}
