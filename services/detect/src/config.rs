//! Detect service configuration.
//!
//! Values are layered: the optional YAML document first, then the
//! parameters recorded in the training dataset's metadata, then flags.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use detection::DetectConfig;
use post_process::PostProcessConfig;
use serde::{Deserialize, Serialize};
use trainset::DatasetMetadata;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub detect: DetectConfig,
    pub post_process: PostProcessConfig,
}

impl ServiceConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        serde_yaml::from_str(&text)
            .with_context(|| format!("Failed to parse config {}", path.display()))
    }

    /// Take the window size and rescaling parameters the model was trained
    /// with.
    pub fn apply_metadata(&mut self, metadata: &DatasetMetadata) {
        self.detect.size = metadata.size;
        self.detect.rescale_intensity = metadata.rescale_intensity;
        self.detect.lower_cut = metadata.lower_cut;
        self.detect.upper_cut = metadata.upper_cut;
    }
}
