//! Dataset metadata written next to the tiles.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use mapping_common::MappingResult;
use serde::{Deserialize, Serialize};
use tiling::BoundaryPolicy;

use crate::config::TrainsetConfig;

/// File name of the metadata document inside a dataset directory.
pub const METADATA_FILE: &str = "metadata.json";

/// Format version of the metadata document.
pub const METADATA_VERSION: u32 = 1;

/// Parameters a dataset was built with. Inference reads `size` (and the
/// rescaling parameters) back from here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetMetadata {
    pub version: u32,
    pub size: usize,
    pub step_size: usize,
    pub buffer_size: f64,
    pub rescale_intensity: bool,
    pub lower_cut: f64,
    pub upper_cut: f64,
    #[serde(default)]
    pub boundary_policy: BoundaryPolicy,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl DatasetMetadata {
    pub fn from_config(config: &TrainsetConfig) -> Self {
        Self {
            version: METADATA_VERSION,
            size: config.size,
            step_size: config.step_size,
            buffer_size: config.buffer_size,
            rescale_intensity: config.rescale_intensity,
            lower_cut: config.lower_cut,
            upper_cut: config.upper_cut,
            boundary_policy: config.boundary_policy,
            seed: Some(config.seed),
            created_at: Some(Utc::now()),
        }
    }
}

/// Write `metadata.json` into `dataset_dir`.
pub fn write_metadata(dataset_dir: &Path, metadata: &DatasetMetadata) -> MappingResult<()> {
    let path = dataset_dir.join(METADATA_FILE);
    let json = serde_json::to_string_pretty(metadata)?;
    fs::write(&path, json)?;
    tracing::info!(path = %path.display(), "Wrote dataset metadata");
    Ok(())
}

/// Read `metadata.json` from `dataset_dir`.
pub fn read_metadata(dataset_dir: &Path) -> MappingResult<DatasetMetadata> {
    let text = fs::read_to_string(dataset_dir.join(METADATA_FILE))?;
    Ok(serde_json::from_str(&text)?)
}
