//! Inference configuration.

use std::path::PathBuf;

use mapping_common::{MappingError, MappingResult};
use serde::{Deserialize, Serialize};
use tiling::BoundaryPolicy;

use crate::preprocess::Preprocessing;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectConfig {
    /// Window side in pixels; must match the classifier input.
    pub size: usize,

    /// Stride between windows; defaults to `size`.
    pub step_size: Option<usize>,

    /// Windows scoring strictly above this are detections.
    pub threshold: f64,

    /// Tiles sent to the classifier per call.
    pub batch_size: usize,

    pub rescale_intensity: bool,
    pub lower_cut: f64,
    pub upper_cut: f64,
    pub sample_stride: usize,

    pub preprocessing: Preprocessing,
    pub boundary_policy: BoundaryPolicy,

    /// Per-raster detections are cached here as `{stem}.geojson`.
    pub checkpoint_dir: Option<PathBuf>,

    /// Fail a raster when any of its windows could not be read.
    pub strict: bool,
}

impl Default for DetectConfig {
    fn default() -> Self {
        Self {
            size: 256,
            step_size: None,
            threshold: 0.3,
            batch_size: 100,
            rescale_intensity: true,
            lower_cut: 2.0,
            upper_cut: 98.0,
            sample_stride: 1,
            preprocessing: Preprocessing::default(),
            boundary_policy: BoundaryPolicy::default(),
            checkpoint_dir: None,
            strict: false,
        }
    }
}

impl DetectConfig {
    pub fn step(&self) -> usize {
        self.step_size.unwrap_or(self.size)
    }

    pub fn validate(&self) -> MappingResult<()> {
        tiling::validate_window_params(self.size, self.step())?;

        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(MappingError::configuration(format!(
                "threshold must be between 0 and 1, got {}",
                self.threshold
            )));
        }
        if self.batch_size == 0 {
            return Err(MappingError::configuration("batch_size must be positive"));
        }
        let cuts_ordered = 0.0 <= self.lower_cut
            && self.lower_cut < self.upper_cut
            && self.upper_cut <= 100.0;
        if self.rescale_intensity && !cuts_ordered {
            return Err(MappingError::configuration(format!(
                "percentile cuts must satisfy 0 <= lower_cut < upper_cut <= 100, got {} and {}",
                self.lower_cut, self.upper_cut
            )));
        }
        Ok(())
    }
}
