//! Post-processing of detection windows.
//!
//! - [`filter_by_mean_neighbor_probability`] drops isolated false positives
//! - [`dissolve`] merges overlapping windows into settlement outlines
//! - [`select_blocks`] keeps reference blocks well covered by detections

pub mod blocks;
pub mod config;
pub mod dissolve;
pub mod neighbors;

pub use blocks::{block_coverage, select_blocks, COVERAGE, DEFAULT_MIN_COVERAGE};
pub use config::PostProcessConfig;
pub use dissolve::{apply_buffer, dissolve, MergedProbability, MEMBERS};
pub use neighbors::{filter_by_mean_neighbor_probability, mean_neighbor_probability};

use mapping_common::ShapeWithProps;

/// Neighbor filter followed by dissolve, as run after inference.
pub fn post_process(
    detections: &[ShapeWithProps],
    config: &PostProcessConfig,
) -> Vec<ShapeWithProps> {
    let filtered =
        filter_by_mean_neighbor_probability(detections, config.neighbours, config.mean_threshold);
    dissolve(&filtered, config.buffer_size, config.merged_probability)
}
