//! Sliding-window tiling of rasters and labeling of windows against
//! ground-truth polygons.

pub mod label;
pub mod windows;

pub use label::{CoverageContour, GroundTruth, WindowLabel};
pub use windows::{
    axis_offsets, sliding_windows, validate_window_params, window_multi_polygon, window_polygon,
    window_to_world_bounds, BoundaryPolicy, SlidingWindows,
};

/// Tile file name for a window: `{raster_stem}__{row_off}_{col_off}.jpg`.
pub fn tile_file_name(raster_stem: &str, window: &mapping_common::Window) -> String {
    format!("{}__{}_{}.jpg", raster_stem, window.row_off, window.col_off)
}
