//! Post-processing configuration.

use mapping_common::{MappingError, MappingResult};
use serde::{Deserialize, Serialize};

use crate::blocks::DEFAULT_MIN_COVERAGE;
use crate::dissolve::MergedProbability;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostProcessConfig {
    /// Minimum adjacent detections for a detection to keep a non-zero mean.
    pub neighbours: usize,

    /// Detections need a neighbor mean strictly above this to survive.
    pub mean_threshold: f64,

    /// Buffer applied before dissolving, in coordinate units.
    pub buffer_size: Option<f64>,

    pub merged_probability: MergedProbability,

    /// Covered fraction a block needs to be selected.
    pub min_coverage: f64,
}

impl Default for PostProcessConfig {
    fn default() -> Self {
        Self {
            neighbours: 3,
            mean_threshold: 0.3,
            buffer_size: None,
            merged_probability: MergedProbability::default(),
            min_coverage: DEFAULT_MIN_COVERAGE,
        }
    }
}

impl PostProcessConfig {
    pub fn validate(&self) -> MappingResult<()> {
        if !(0.0..=1.0).contains(&self.mean_threshold) {
            return Err(MappingError::configuration(format!(
                "mean_threshold must be between 0 and 1, got {}",
                self.mean_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.min_coverage) {
            return Err(MappingError::configuration(format!(
                "min_coverage must be between 0 and 1, got {}",
                self.min_coverage
            )));
        }
        if let Some(size) = self.buffer_size {
            if !size.is_finite() || size < 0.0 {
                return Err(MappingError::configuration(format!(
                    "buffer_size must be a non-negative number, got {}",
                    size
                )));
            }
        }
        Ok(())
    }
}
