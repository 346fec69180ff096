//! Configuration for dataset building.

use mapping_common::{MappingError, MappingResult};
use serde::{Deserialize, Serialize};
use tiling::BoundaryPolicy;

/// Configuration for the trainset builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainsetConfig {
    /// Window side in pixels.
    pub size: usize,

    /// Stride between consecutive windows in pixels.
    pub step_size: usize,

    /// Buffer applied to ground-truth polygons, in raster CRS units.
    pub buffer_size: f64,

    /// Stretch tiles between the global intensity percentiles.
    pub rescale_intensity: bool,

    /// Lower percentile cut for rescaling (0-100).
    pub lower_cut: f64,

    /// Upper percentile cut for rescaling (0-100).
    pub upper_cut: f64,

    /// Sample every n-th row and column when computing percentiles.
    pub sample_stride: usize,

    /// Fraction of each class reserved for the test subset.
    pub test_size: f64,

    /// Fraction of each class reserved for the validation subset.
    pub validation_size: f64,

    /// Negative samples kept per positive sample (>= 1).
    pub balancing_multiplier: f64,

    /// Placement of the last window on each axis.
    pub boundary_policy: BoundaryPolicy,

    /// Base seed for shuffling; each raster derives its own seed from it.
    pub seed: u64,

    /// Rasters processed in parallel (0 = one per CPU).
    pub jobs: usize,

    /// Fail a raster when any of its windows could not be read.
    pub strict: bool,
}

impl Default for TrainsetConfig {
    fn default() -> Self {
        Self {
            size: 256,
            step_size: 128,
            buffer_size: 0.0,
            rescale_intensity: true,
            lower_cut: 2.0,
            upper_cut: 98.0,
            sample_stride: 1,
            test_size: 0.25,
            validation_size: 0.25,
            balancing_multiplier: 1.0,
            boundary_policy: BoundaryPolicy::default(),
            seed: 42,
            jobs: 1,
            strict: false,
        }
    }
}

impl TrainsetConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> MappingResult<()> {
        tiling::validate_window_params(self.size, self.step_size)?;

        if self.buffer_size < 0.0 || !self.buffer_size.is_finite() {
            return Err(MappingError::configuration(format!(
                "buffer_size must be a non-negative number, got {}",
                self.buffer_size
            )));
        }

        if self.rescale_intensity {
            let cuts_ok = (0.0..=100.0).contains(&self.lower_cut)
                && (0.0..=100.0).contains(&self.upper_cut)
                && self.lower_cut < self.upper_cut;
            if !cuts_ok {
                return Err(MappingError::configuration(format!(
                    "percentile cuts must satisfy 0 <= lower_cut < upper_cut <= 100, got {} and {}",
                    self.lower_cut, self.upper_cut
                )));
            }
        }

        let fractions = [
            ("test_size", self.test_size),
            ("validation_size", self.validation_size),
        ];
        for (name, value) in fractions {
            if !(0.0..=1.0).contains(&value) {
                return Err(MappingError::configuration(format!(
                    "{} must be between 0 and 1, got {}",
                    name, value
                )));
            }
        }
        if self.test_size + self.validation_size > 1.0 {
            return Err(MappingError::configuration(format!(
                "test_size + validation_size must not exceed 1, got {}",
                self.test_size + self.validation_size
            )));
        }

        if self.balancing_multiplier < 1.0 || !self.balancing_multiplier.is_finite() {
            return Err(MappingError::configuration(format!(
                "balancing_multiplier must be at least 1, got {}",
                self.balancing_multiplier
            )));
        }

        Ok(())
    }
}
