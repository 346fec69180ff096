//! Dissolve service configuration.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use post_process::PostProcessConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DissolveConfig {
    #[serde(flatten)]
    pub post_process: PostProcessConfig,

    /// Run the neighbor-probability filter before dissolving.
    pub neighbor_filter: bool,
}

impl DissolveConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        serde_yaml::from_str(&text)
            .with_context(|| format!("Failed to parse config {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_skip_filter() {
        let config = DissolveConfig::load(None).unwrap();
        assert!(!config.neighbor_filter);
        assert_eq!(config.post_process, PostProcessConfig::default());
    }

    #[test]
    fn test_flat_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dissolve.yaml");
        fs::write(
            &path,
            "neighbor_filter: true\nneighbours: 2\nbuffer_size: 5.0\nmin_coverage: 0.5\n",
        )
        .unwrap();

        let config = DissolveConfig::load(Some(&path)).unwrap();
        assert!(config.neighbor_filter);
        assert_eq!(config.post_process.neighbours, 2);
        assert_eq!(config.post_process.buffer_size, Some(5.0));
        assert_eq!(config.post_process.min_coverage, 0.5);
        assert_eq!(config.post_process.mean_threshold, 0.3);
    }
}
