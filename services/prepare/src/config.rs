//! Optional YAML configuration for the prepare service.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use trainset::TrainsetConfig;

/// Load a trainset configuration from YAML; missing keys take defaults.
/// Without a path the defaults are returned.
pub fn load_config(path: Option<&Path>) -> Result<TrainsetConfig> {
    let Some(path) = path else {
        return Ok(TrainsetConfig::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    serde_yaml::from_str(&text)
        .with_context(|| format!("Failed to parse config {}", path.display()))
}
