use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Settings loaded from a `--config` JSON file
///
/// Every field is optional. Command-line flags are layered on top: list
/// flags append to these lists, scalar flags replace these values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub matching_groups: Vec<String>,
    pub ignore_patterns: Vec<String>,
    pub time_format: Option<String>,
    pub filter: Option<String>,
    pub sort: Vec<String>,
    pub interval: Option<i64>,
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self> {
        tracing::debug!("Loading config: {}", path.display());

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }
}
