//! Configuration for schemactl
//!
//! Read from `~/.schemaflow/config.toml` when present. Every key is optional;
//! command-line flags and `SCHEMA_REGISTRY_URL` take precedence.

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_REGISTRY_URL: &str = "http://localhost:8081";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Schema registry base URL
    pub registry_url: String,

    /// Default output format
    pub output_format: OutputFormat,

    /// Enable colored output
    pub colored: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Table,
    Json,
    Yaml,
    Text,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            registry_url: DEFAULT_REGISTRY_URL.to_string(),
            output_format: OutputFormat::Table,
            colored: true,
        }
    }
}

impl Config {
    /// Load the user config, or defaults when there is none
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// ~/.schemaflow/config.toml
    pub fn config_path() -> PathBuf {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(".schemaflow").join("config.toml")
    }
}
